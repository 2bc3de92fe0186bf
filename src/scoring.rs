//! Pronunciation scoring: normalize → edit distance → bounded score report.
//!
//! This is the one deterministic, pure piece of the backend. Given the
//! reference text, the recognized text, and the recognizer's confidence,
//! it produces an overall score, an accuracy tier, fluency and tone
//! estimates, and an encouragement message. No I/O, no randomness.

use serde::Serialize;

/// Floor applied to the tone-accuracy estimate. Tunable: any recognized
/// speech gets a non-punitive baseline tone score.
pub const TONE_FLOOR: f64 = 60.0;

/// Accuracy tier derived from the composite score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
  Poor,
  Fair,
  Good,
  Excellent,
}

/// Encouragement shown to the learner, picked per score band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Encouragement {
  pub title: String,
  pub message: String,
}

/// Full scoring result. Every numeric field is an integer in [0, 100].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreReport {
  pub score: u8,
  pub accuracy: Accuracy,
  pub fluency: u8,
  #[serde(rename = "toneAccuracy")]
  pub tone_accuracy: u8,
  pub similarity: u8,
  pub confidence: u8,
  pub encouragement: Encouragement,
}

// Ordered ladders, highest threshold first; first match wins.
const ACCURACY_BANDS: [(u8, Accuracy); 4] = [
  (90, Accuracy::Excellent),
  (75, Accuracy::Good),
  (60, Accuracy::Fair),
  (0, Accuracy::Poor),
];

const ENCOURAGEMENT_BANDS: [(u8, &str, &str); 5] = [
  (90, "好犀利！(太棒了)", "发音非常自然，继续保持。"),
  (80, "唔错喔！(很好)", "发音很标准，再接再厉！"),
  (70, "过得去！(还可以)", "有些地方需要练习，加油！"),
  (60, "继续努力！(再努力)", "多听多说，一定会有进步！"),
  (0, "重新嚟过！(再试试)", "不要气馁，多练习几次！"),
];

/// Canonicalize text for comparison: lowercase, then keep only ASCII
/// alphanumerics and CJK ideographs (U+4E00–U+9FA5). Everything else is
/// removed outright so retained characters become adjacent.
pub fn normalize(text: &str) -> String {
  text
    .to_lowercase()
    .chars()
    .filter(|&ch| ch.is_ascii_alphanumeric() || ('\u{4E00}'..='\u{9FA5}').contains(&ch))
    .collect()
}

/// Levenshtein distance over Unicode scalar values, two-row DP.
pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() { return b.len(); }
  if b.is_empty() { return a.len(); }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0usize; b.len() + 1];

  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=b.len() {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[b.len()]
}

fn accuracy_for(score: u8) -> Accuracy {
  ACCURACY_BANDS
    .iter()
    .find(|(min, _)| score >= *min)
    .map(|(_, tier)| *tier)
    .unwrap_or(Accuracy::Poor)
}

fn encouragement_for(score: u8) -> Encouragement {
  let (_, title, message) = ENCOURAGEMENT_BANDS
    .iter()
    .find(|(min, _, _)| score >= *min)
    .unwrap_or(&ENCOURAGEMENT_BANDS[4]);
  Encouragement { title: (*title).to_string(), message: (*message).to_string() }
}

// Rounding convention throughout: round half away from zero (f64::round).
fn round_pct(v: f64) -> u8 {
  v.round().clamp(0.0, 100.0) as u8
}

/// Score a spoken imitation against the reference text.
///
/// `confidence` is the recognizer's value, nominally in [0,1]. It is
/// trusted as-is (callers own the contract); all outputs are clamped to
/// [0,100]. Pure and deterministic: identical inputs produce identical
/// reports.
pub fn score_pronunciation(original_text: &str, user_text: &str, confidence: f64) -> ScoreReport {
  let original = normalize(original_text);
  let user = normalize(user_text);

  let max_len = original.chars().count().max(user.chars().count()).max(1);
  let distance = levenshtein(&original, &user);
  let similarity = 1.0 - distance as f64 / max_len as f64;

  let similarity_score = similarity * 100.0;
  let confidence_score = confidence * 100.0;

  // The rounded tone estimate feeds the composite.
  let tone_accuracy = round_pct(
    (similarity_score * 0.9 + confidence_score * 0.1).clamp(TONE_FLOOR, 100.0),
  );

  let score = round_pct(
    similarity_score * 0.6 + confidence_score * 0.25 + f64::from(tone_accuracy) * 0.15,
  );

  let fluency = round_pct((f64::from(score) * 0.7 + confidence_score * 0.3) * 0.95 + 5.0);

  ScoreReport {
    score,
    accuracy: accuracy_for(score),
    fluency,
    tone_accuracy,
    similarity: round_pct(similarity_score),
    confidence: round_pct(confidence_score),
    encouragement: encouragement_for(score),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_strips_punctuation_and_case() {
    assert_eq!(normalize("你好，世界！ Hello 123."), "你好世界hello123");
    assert_eq!(normalize("**markdown** _artifacts_"), "markdownartifacts");
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("！？。，"), "");
  }

  #[test]
  fn normalize_is_idempotent() {
    for s in ["呢度喺街边饮奶茶", "Hello, 世界! 42", "", "¿¡ümlaut?"] {
      let once = normalize(s);
      assert_eq!(normalize(&once), once);
    }
  }

  #[test]
  fn levenshtein_basics() {
    assert_eq!(levenshtein("", ""), 0);
    assert_eq!(levenshtein("", "你好"), 2);
    assert_eq!(levenshtein("你好", ""), 2);
    assert_eq!(levenshtein("kitten", "sitting"), 3);
    assert_eq!(levenshtein("我想食饭", "我想食面"), 1);
  }

  #[test]
  fn levenshtein_symmetry_and_identity() {
    let samples = ["", "你好", "我想食饭", "abc", "街边饮奶茶"];
    for a in samples {
      assert_eq!(levenshtein(a, a), 0);
      for b in samples {
        assert_eq!(levenshtein(a, b), levenshtein(b, a));
      }
    }
  }

  #[test]
  fn levenshtein_triangle_inequality() {
    let samples = ["你好", "我想食饭", "我想食面", "呢度喺街边", ""];
    for a in samples {
      for b in samples {
        for c in samples {
          assert!(levenshtein(a, c) <= levenshtein(a, b) + levenshtein(b, c));
        }
      }
    }
  }

  #[test]
  fn perfect_match_scores_excellent() {
    let r = score_pronunciation("呢度喺街边饮奶茶", "呢度喺街边饮奶茶", 0.92);
    assert_eq!(r.similarity, 100);
    assert_eq!(r.confidence, 92);
    assert_eq!(r.tone_accuracy, 99);
    assert_eq!(r.score, 98);
    assert_eq!(r.accuracy, Accuracy::Excellent);
    assert_eq!(r.encouragement.title, "好犀利！(太棒了)");
  }

  #[test]
  fn one_char_off_scores_good() {
    let r = score_pronunciation("我想食饭", "我想食面", 0.9);
    assert_eq!(r.similarity, 75);
    assert_eq!(r.confidence, 90);
    assert_eq!(r.tone_accuracy, 77);
    assert_eq!(r.score, 79);
    assert_eq!(r.accuracy, Accuracy::Good);
    // 79 falls below the 80 encouragement band into the 70 band.
    assert_eq!(r.encouragement.title, "过得去！(还可以)");
  }

  #[test]
  fn silence_against_reference_scores_poor() {
    let r = score_pronunciation("你好", "", 0.5);
    assert_eq!(r.similarity, 0);
    assert_eq!(r.confidence, 50);
    assert_eq!(r.tone_accuracy, 60); // floor applies
    assert_eq!(r.score, 22); // 21.5 rounds away from zero
    assert_eq!(r.accuracy, Accuracy::Poor);
    assert_eq!(r.encouragement.title, "重新嚟过！(再试试)");
  }

  #[test]
  fn both_empty_does_not_divide_by_zero() {
    let r = score_pronunciation("", "", 1.0);
    assert_eq!(r.similarity, 100);
    assert!(r.score <= 100);
  }

  #[test]
  fn disjoint_low_confidence_bottoms_out() {
    let r = score_pronunciation("我想食饭", "天气不错", 0.0);
    assert_eq!(r.similarity, 0);
    assert_eq!(r.confidence, 0);
    assert_eq!(r.accuracy, Accuracy::Poor);
    assert!(r.score <= 15);
  }

  #[test]
  fn outputs_always_in_range() {
    let cases = [
      ("你好", "你好", 1.0),
      ("你好", "", 0.0),
      ("", "你好", 1.0),
      ("", "", 0.0),
      ("我想食饭", "我想食面", 0.5),
      // out-of-range confidence is a caller contract violation, but the
      // outputs still stay bounded
      ("你好", "你好", 1.5),
    ];
    for (orig, user, conf) in cases {
      let r = score_pronunciation(orig, user, conf);
      assert!(r.score <= 100);
      assert!(r.fluency <= 100);
      assert!(r.tone_accuracy <= 100);
      assert!(r.similarity <= 100);
      assert!(r.confidence <= 100);
    }
  }

  #[test]
  fn scorer_is_deterministic() {
    let a = score_pronunciation("呢度喺街边饮奶茶", "呢度喺街边饮茶", 0.87);
    let b = score_pronunciation("呢度喺街边饮奶茶", "呢度喺街边饮茶", 0.87);
    assert_eq!(a, b);
  }

  #[test]
  fn accuracy_ladder_boundaries() {
    assert_eq!(accuracy_for(100), Accuracy::Excellent);
    assert_eq!(accuracy_for(90), Accuracy::Excellent);
    assert_eq!(accuracy_for(89), Accuracy::Good);
    assert_eq!(accuracy_for(75), Accuracy::Good);
    assert_eq!(accuracy_for(74), Accuracy::Fair);
    assert_eq!(accuracy_for(60), Accuracy::Fair);
    assert_eq!(accuracy_for(59), Accuracy::Poor);
    assert_eq!(accuracy_for(0), Accuracy::Poor);
  }

  #[test]
  fn encouragement_ladder_boundaries() {
    assert_eq!(encouragement_for(95).title, "好犀利！(太棒了)");
    assert_eq!(encouragement_for(90).title, "好犀利！(太棒了)");
    assert_eq!(encouragement_for(89).title, "唔错喔！(很好)");
    assert_eq!(encouragement_for(80).title, "唔错喔！(很好)");
    assert_eq!(encouragement_for(79).title, "过得去！(还可以)");
    assert_eq!(encouragement_for(70).title, "过得去！(还可以)");
    assert_eq!(encouragement_for(69).title, "继续努力！(再努力)");
    assert_eq!(encouragement_for(60).title, "继续努力！(再努力)");
    assert_eq!(encouragement_for(59).title, "重新嚟过！(再试试)");
    assert_eq!(encouragement_for(0).title, "重新嚟过！(再试试)");
  }
}
