//! Seed data: built-in achievement definitions and the fallback story.

use crate::domain::{Achievement, Story, UserStatistics};
use crate::pinyin::annotate_words;

/// Achievement definition: id, title, description, and the unlock
/// predicate over the user's statistics.
struct AchievementDef {
  id: &'static str,
  title: &'static str,
  description: &'static str,
  unlocked: fn(&UserStatistics) -> bool,
}

const ACHIEVEMENTS: &[AchievementDef] = &[
  AchievementDef {
    id: "first_recording",
    title: "开口第一句",
    description: "完成第一次跟读录音",
    unlocked: |s| s.total_recordings >= 1,
  },
  AchievementDef {
    id: "ten_recordings",
    title: "勤学苦练",
    description: "完成 10 次跟读录音",
    unlocked: |s| s.total_recordings >= 10,
  },
  AchievementDef {
    id: "first_excellent",
    title: "发音达人",
    description: "获得一次 90 分以上的成绩",
    unlocked: |s| s.best_score >= 90,
  },
  AchievementDef {
    id: "week_streak",
    title: "七日坚持",
    description: "连续练习 7 天",
    unlocked: |s| s.streak_days >= 7,
  },
  AchievementDef {
    id: "average_good",
    title: "稳定发挥",
    description: "平均分达到 75 分（至少 5 次录音）",
    unlocked: |s| s.total_recordings >= 5 && s.average_score >= 75,
  },
];

/// Evaluate the built-in achievement set against a statistics snapshot.
/// Users with no statistics yet get the full list, all locked.
pub fn achievements_for(stats: Option<&UserStatistics>) -> Vec<Achievement> {
  ACHIEVEMENTS
    .iter()
    .map(|def| Achievement {
      id: def.id,
      title: def.title,
      description: def.description,
      unlocked: stats.map(|s| (def.unlocked)(s)).unwrap_or(false),
    })
    .collect()
}

/// Served by the generation endpoint when no OpenAI client is configured,
/// so the app stays demonstrable offline.
pub fn fallback_story() -> Story {
  let mandarin = "今天天气很好，我们在公园里散步。小狗在草地上跑来跑去。".to_string();
  let words = annotate_words(&mandarin);
  Story {
    mandarin,
    cantonese: "今日天气几好，我哋喺公园度散步。小狗喺草地度走嚟走去。".into(),
    words,
  }
}
