//! Domain models: generated stories, learning records, user state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single annotated character from a generated story.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WordEntry {
  #[serde(rename = "char")]
  pub hanzi: String,
  pub pinyin: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub jyutping: String,
}

/// Bilingual story generated from a photo.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Story {
  pub mandarin: String,
  pub cantonese: String,
  #[serde(default)]
  pub words: Vec<WordEntry>,
}

/// User profile, keyed by an opaque user id supplied by the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(rename = "userId")]
  pub user_id: String,
  #[serde(default)]
  pub nickname: String,
  /// Free-form learner level hint, e.g. "beginner" / "hsk2".
  #[serde(default)]
  pub level: String,
  #[serde(rename = "createdAt", default = "Utc::now")]
  pub created_at: DateTime<Utc>,
}

/// One photo-to-story session kept in the user's history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningRecord {
  pub id: String,
  #[serde(rename = "userId")]
  pub user_id: String,
  pub mandarin: String,
  pub cantonese: String,
  /// Best pronunciation score achieved for this story, if any.
  #[serde(default)]
  pub score: Option<u8>,
  #[serde(rename = "createdAt")]
  pub created_at: DateTime<Utc>,
}

/// Shareable link to a learning record. Expires 30 days after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRecord {
  pub code: String,
  #[serde(rename = "recordId")]
  pub record_id: String,
  #[serde(rename = "userId")]
  pub user_id: String,
  #[serde(rename = "createdAt")]
  pub created_at: DateTime<Utc>,
  #[serde(rename = "expiresAt")]
  pub expires_at: DateTime<Utc>,
}

impl ShareRecord {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// Aggregate practice statistics, updated after each evaluation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserStatistics {
  #[serde(rename = "userId")]
  pub user_id: String,
  #[serde(rename = "totalRecordings")]
  pub total_recordings: u32,
  #[serde(rename = "totalScore")]
  pub total_score: u64,
  #[serde(rename = "averageScore")]
  pub average_score: u8,
  #[serde(rename = "bestScore")]
  pub best_score: u8,
  #[serde(rename = "streakDays")]
  pub streak_days: u32,
  #[serde(rename = "lastPracticeDay", default, skip_serializing_if = "Option::is_none")]
  pub last_practice_day: Option<chrono::NaiveDate>,
}

impl UserStatistics {
  pub fn new(user_id: &str) -> Self {
    Self { user_id: user_id.to_string(), ..Default::default() }
  }

  /// Fold one evaluation into the aggregates. Streak counts calendar days:
  /// practicing on consecutive days extends it, a gap resets it to 1.
  pub fn record_evaluation(&mut self, score: u8, now: DateTime<Utc>) {
    self.total_recordings += 1;
    self.total_score += u64::from(score);
    self.average_score = (self.total_score / u64::from(self.total_recordings)) as u8;
    self.best_score = self.best_score.max(score);

    let today = now.date_naive();
    self.streak_days = match self.last_practice_day {
      Some(last) if last == today => self.streak_days.max(1),
      Some(last) if today - last == chrono::Duration::days(1) => self.streak_days + 1,
      _ => 1,
    };
    self.last_practice_day = Some(today);
  }
}

/// Built-in achievement definition. Unlock state is derived from
/// statistics, not stored per se.
#[derive(Clone, Debug, Serialize)]
pub struct Achievement {
  pub id: &'static str,
  pub title: &'static str,
  pub description: &'static str,
  pub unlocked: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
  }

  #[test]
  fn statistics_aggregate_scores() {
    let mut s = UserStatistics::new("u1");
    s.record_evaluation(80, at(2026, 8, 1));
    s.record_evaluation(90, at(2026, 8, 1));
    assert_eq!(s.total_recordings, 2);
    assert_eq!(s.average_score, 85);
    assert_eq!(s.best_score, 90);
    assert_eq!(s.streak_days, 1);
  }

  #[test]
  fn streak_extends_on_consecutive_days_and_resets_on_gap() {
    let mut s = UserStatistics::new("u1");
    s.record_evaluation(70, at(2026, 8, 1));
    s.record_evaluation(70, at(2026, 8, 2));
    assert_eq!(s.streak_days, 2);
    s.record_evaluation(70, at(2026, 8, 2));
    assert_eq!(s.streak_days, 2);
    s.record_evaluation(70, at(2026, 8, 10));
    assert_eq!(s.streak_days, 1);
  }

  #[test]
  fn share_record_expiry_window() {
    let created = at(2026, 8, 1);
    let share = ShareRecord {
      code: "abc12345".into(),
      record_id: "r1".into(),
      user_id: "u1".into(),
      created_at: created,
      expires_at: created + chrono::Duration::days(30),
    };
    assert!(!share.is_expired(at(2026, 8, 20)));
    assert!(share.is_expired(at(2026, 9, 1)));
  }
}
