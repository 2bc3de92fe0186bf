//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Every success payload carries `"success": true`; failures are emitted
//! by `ApiError` as `{"success": false, "error": ...}`.

use serde::{Deserialize, Serialize};

use crate::domain::{Achievement, LearningRecord, UserProfile, UserStatistics, WordEntry};
use crate::scoring::{Encouragement, ScoreReport};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Response of `POST /api/story`: the bilingual story, per-character
/// annotations, and best-effort base64 MP3 audio for each language.
#[derive(Serialize)]
pub struct StoryOut {
    pub success: bool,
    pub mandarin: String,
    pub cantonese: String,
    /// Space-separated pinyin (tone diacritics) for the mandarin text.
    pub pinyin: String,
    pub words: Vec<WordEntry>,
    #[serde(rename = "mandarinAudio", skip_serializing_if = "Option::is_none")]
    pub mandarin_audio: Option<String>,
    #[serde(rename = "cantoneseAudio", skip_serializing_if = "Option::is_none")]
    pub cantonese_audio: Option<String>,
    #[serde(rename = "recordId", skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Response of `POST /api/evaluate`: every ScoreReport field plus the
/// original and recognized text strings.
#[derive(Serialize)]
pub struct EvaluateOut {
    pub success: bool,
    pub score: u8,
    pub accuracy: crate::scoring::Accuracy,
    pub fluency: u8,
    #[serde(rename = "toneAccuracy")]
    pub tone_accuracy: u8,
    pub similarity: u8,
    pub confidence: u8,
    pub encouragement: Encouragement,
    #[serde(rename = "originalText")]
    pub original_text: String,
    #[serde(rename = "recognizedText")]
    pub recognized_text: String,
}

impl EvaluateOut {
    pub fn from_report(report: ScoreReport, original_text: String, recognized_text: String) -> Self {
        Self {
            success: true,
            score: report.score,
            accuracy: report.accuracy,
            fluency: report.fluency,
            tone_accuracy: report.tone_accuracy,
            similarity: report.similarity,
            confidence: report.confidence,
            encouragement: report.encouragement,
            original_text,
            recognized_text,
        }
    }
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub success: bool,
    pub records: Vec<LearningRecord>,
}

#[derive(Serialize)]
pub struct DeletedOut {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct ProfileIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Serialize)]
pub struct ProfileOut {
    pub success: bool,
    pub profile: UserProfile,
}

#[derive(Serialize)]
pub struct StatsOut {
    pub success: bool,
    pub statistics: UserStatistics,
}

#[derive(Serialize)]
pub struct AchievementsOut {
    pub success: bool,
    pub achievements: Vec<Achievement>,
}

#[derive(Deserialize)]
pub struct ShareIn {
    #[serde(rename = "recordId")]
    pub record_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ShareOut {
    pub success: bool,
    pub code: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct SharedRecordOut {
    pub success: bool,
    pub record: LearningRecord,
}
