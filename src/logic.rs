//! Orchestration shared by the HTTP handlers.
//!
//! This includes:
//!   - Photo → bilingual story, with the two-stage fallback pipeline
//!     (direct bilingual generation, then describe-then-translate)
//!   - Best-effort speech synthesis for both story languages
//!   - Audio → transcript → pronunciation score
//!   - History/statistics/achievement bookkeeping around both paths

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{LearningRecord, Story, UserStatistics};
use crate::error::ApiError;
use crate::pinyin::annotate_words;
use crate::scoring::{score_pronunciation, ScoreReport};
use crate::seeds::fallback_story;
use crate::state::AppState;
use crate::util::{is_cjk, trunc_for_log};

/// A generated story plus best-effort audio for each language (MP3 bytes).
pub struct GeneratedStory {
  pub story: Story,
  pub mandarin_audio: Option<Vec<u8>>,
  pub cantonese_audio: Option<Vec<u8>>,
}

/// Generate a bilingual story from the uploaded photo.
///
/// Primary path: one vision call returning mandarin + cantonese + word
/// annotations. If that fails, fall back to describe-then-translate; a
/// combined error surfaces only when both legs fail. Without an OpenAI
/// client the built-in seed story is served.
#[instrument(level = "info", skip(state, image_bytes), fields(%level, image_len = image_bytes.len()))]
pub async fn generate_story(
  state: &AppState,
  image_bytes: &[u8],
  mime: &str,
  level: &str,
) -> Result<GeneratedStory, ApiError> {
  let Some(oa) = &state.openai else {
    warn!(target: "story", "OpenAI not configured; serving seed story");
    return Ok(GeneratedStory {
      story: fallback_story(),
      mandarin_audio: None,
      cantonese_audio: None,
    });
  };

  let mut story = match oa
    .describe_image_bilingual(&state.prompts, image_bytes, mime, level)
    .await
  {
    Ok(s) => s,
    Err(primary_err) => {
      error!(target: "story", error = %primary_err, "Bilingual generation failed; trying describe-then-translate");
      match describe_then_translate(state, image_bytes, mime).await {
        Ok(s) => s,
        Err(fallback_err) => {
          return Err(ApiError::upstream(format!(
            "Story generation failed: {primary_err}; fallback also failed: {fallback_err}"
          )));
        }
      }
    }
  };

  // Word annotations are model-provided when possible; fill in locally
  // otherwise so the client always gets per-character pinyin.
  if story.words.is_empty() {
    story.words = annotate_words(&story.mandarin);
  }

  let mandarin_audio = synthesize_best_effort(state, &story.mandarin, "mandarin").await;
  let cantonese_audio = synthesize_best_effort(state, &story.cantonese, "cantonese").await;

  info!(
    target: "story",
    mandarin_preview = %story.mandarin.chars().take(20).collect::<String>(),
    words = story.words.len(),
    has_mandarin_audio = mandarin_audio.is_some(),
    has_cantonese_audio = cantonese_audio.is_some(),
    "Story generated"
  );

  Ok(GeneratedStory { story, mandarin_audio, cantonese_audio })
}

/// Fallback pipeline: plain Mandarin description, then Cantonese translation.
async fn describe_then_translate(
  state: &AppState,
  image_bytes: &[u8],
  mime: &str,
) -> Result<Story, String> {
  let oa = state.openai.as_ref().ok_or("OpenAI not configured")?;
  let mandarin = oa.describe_image(&state.prompts, image_bytes, mime).await?;
  if !mandarin.chars().any(is_cjk) {
    return Err("describe step returned no Chinese text".into());
  }
  let cantonese = oa.translate_to_cantonese(&state.prompts, &mandarin).await?;
  debug!(target: "story", "Fallback describe-then-translate succeeded");
  Ok(Story { mandarin, cantonese, words: Vec::new() })
}

/// TTS failures degrade the response to text-only instead of failing it.
async fn synthesize_best_effort(state: &AppState, text: &str, which: &str) -> Option<Vec<u8>> {
  let oa = state.openai.as_ref()?;
  if text.trim().is_empty() {
    return None;
  }
  match oa.synthesize_speech(text).await {
    Ok(bytes) => Some(bytes),
    Err(e) => {
      error!(target: "story", %which, error = %e, "TTS failed; returning text-only");
      None
    }
  }
}

/// Outcome of one evaluation request.
pub struct Evaluation {
  pub report: ScoreReport,
  pub recognized_text: String,
}

/// Recognize the uploaded audio and score it against the reference text.
/// The recognizer may fail (network/auth/timeout); the scorer cannot.
#[instrument(level = "info", skip(state, audio_bytes, original_text), fields(audio_len = audio_bytes.len(), text_len = original_text.len(), %language))]
pub async fn evaluate_pronunciation(
  state: &AppState,
  original_text: &str,
  audio_bytes: Vec<u8>,
  filename: &str,
  language: &str,
) -> Result<Evaluation, ApiError> {
  let oa = state
    .openai
    .as_ref()
    .ok_or_else(|| ApiError::upstream("Speech recognizer not configured (OPENAI_API_KEY missing)"))?;

  let (recognized_text, confidence) = oa
    .transcribe(audio_bytes, filename, language)
    .await
    .map_err(|e| ApiError::upstream(format!("Speech recognition failed: {e}")))?;

  let report = score_pronunciation(original_text, &recognized_text, confidence);
  debug!(target: "scoring", recognized = %trunc_for_log(&recognized_text, 60), "Recognizer output");
  info!(
    target: "scoring",
    score = report.score,
    similarity = report.similarity,
    confidence = report.confidence,
    "Evaluation scored"
  );

  Ok(Evaluation { report, recognized_text })
}

/// Append a history record for a generated story.
#[instrument(level = "debug", skip(state, story), fields(%user_id))]
pub async fn record_story(
  state: &AppState,
  user_id: &str,
  story: &Story,
) -> Result<LearningRecord, ApiError> {
  let record = LearningRecord {
    id: Uuid::new_v4().to_string(),
    user_id: user_id.to_string(),
    mandarin: story.mandarin.clone(),
    cantonese: story.cantonese.clone(),
    score: None,
    created_at: Utc::now(),
  };
  state.store.append_record(record.clone()).await?;
  Ok(record)
}

/// Fold an evaluation score into the user's statistics and return the
/// updated snapshot.
#[instrument(level = "debug", skip(state), fields(%user_id, score))]
pub async fn update_statistics(
  state: &AppState,
  user_id: &str,
  score: u8,
) -> Result<UserStatistics, ApiError> {
  let mut stats = state
    .store
    .get_statistics(user_id)
    .await?
    .unwrap_or_else(|| UserStatistics::new(user_id));
  stats.record_evaluation(score, Utc::now());
  state.store.put_statistics(stats.clone()).await?;
  Ok(stats)
}
