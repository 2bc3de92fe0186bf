//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic and the store. Each handler is instrumented and logs parameters
//! and basic result info; uploads are validated before any collaborator
//! call.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use chrono::{Duration, Utc};
use tracing::{info, instrument};

use crate::domain::{ShareRecord, UserProfile, UserStatistics};
use crate::error::ApiError;
use crate::logic::{evaluate_pronunciation, generate_story, record_story, update_statistics};
use crate::protocol::*;
use crate::seeds::achievements_for;
use crate::state::AppState;
use crate::util::random_share_code;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "webm", "ogg"];
const SHARE_EXPIRY_DAYS: i64 = 30;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

struct Upload {
  bytes: Vec<u8>,
  filename: String,
  mime: String,
}

/// Pull one file plus named text fields out of a multipart body.
async fn read_multipart(
  mut multipart: Multipart,
  file_field: &str,
  allowed_extensions: &[&str],
) -> Result<(Upload, std::collections::HashMap<String, String>), ApiError> {
  let mut upload: Option<Upload> = None;
  let mut texts = std::collections::HashMap::new();

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
  {
    let name = field.name().unwrap_or_default().to_string();
    if name == file_field {
      let filename = field.file_name().unwrap_or("upload").to_string();
      let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
      let extension = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
      if !allowed_extensions.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
          "Unsupported {file_field} type '.{extension}'; allowed: {}",
          allowed_extensions.join(", ")
        )));
      }
      let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::validation(format!("Failed to read {file_field} upload: {e}")))?
        .to_vec();
      if bytes.is_empty() {
        return Err(ApiError::validation(format!("Empty {file_field} upload")));
      }
      if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::validation(format!(
          "{file_field} upload exceeds {} MB limit",
          MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
      }
      upload = Some(Upload { bytes, filename, mime });
    } else {
      let value = field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Failed to read field '{name}': {e}")))?;
      texts.insert(name, value);
    }
  }

  let upload = upload
    .ok_or_else(|| ApiError::validation(format!("Missing required '{file_field}' field")))?;
  Ok((upload, texts))
}

/// `POST /api/story` — multipart: image (required), level, userId.
#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_story(
  State(state): State<Arc<AppState>>,
  multipart: Multipart,
) -> Result<Json<StoryOut>, ApiError> {
  let (upload, texts) = read_multipart(multipart, "image", IMAGE_EXTENSIONS).await?;
  let level = texts.get("level").map(String::as_str).unwrap_or("beginner");
  let user_id = texts.get("userId").filter(|s| !s.is_empty());

  let generated = generate_story(&state, &upload.bytes, &upload.mime, level).await?;

  let record_id = match user_id {
    Some(uid) => Some(record_story(&state, uid, &generated.story).await?.id),
    None => None,
  };

  let b64 = |bytes: Vec<u8>| base64::engine::general_purpose::STANDARD.encode(bytes);
  info!(target: "story", %level, has_user = record_id.is_some(), "HTTP story served");

  Ok(Json(StoryOut {
    success: true,
    pinyin: crate::pinyin::to_pinyin_diacritics(&generated.story.mandarin),
    mandarin: generated.story.mandarin,
    cantonese: generated.story.cantonese,
    words: generated.story.words,
    mandarin_audio: generated.mandarin_audio.map(b64),
    cantonese_audio: generated.cantonese_audio.map(b64),
    record_id,
  }))
}

/// `POST /api/evaluate` — multipart: audio (required), text (required),
/// language, userId, recordId.
#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  multipart: Multipart,
) -> Result<Json<EvaluateOut>, ApiError> {
  let (upload, texts) = read_multipart(multipart, "audio", AUDIO_EXTENSIONS).await?;
  let original_text = texts
    .get("text")
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| ApiError::validation("Missing required 'text' field"))?
    .clone();
  let language = texts.get("language").map(String::as_str).unwrap_or("zh");

  let evaluation =
    evaluate_pronunciation(&state, &original_text, upload.bytes, &upload.filename, language)
      .await?;

  if let Some(uid) = texts.get("userId").filter(|s| !s.is_empty()) {
    update_statistics(&state, uid, evaluation.report.score).await?;
  }
  // Optional link back to the story being practiced: keep its best score.
  if let Some(rid) = texts.get("recordId").filter(|s| !s.is_empty()) {
    state.store.update_record_score(rid, evaluation.report.score).await?;
  }

  info!(target: "scoring", score = evaluation.report.score, "HTTP evaluate served");
  Ok(Json(EvaluateOut::from_report(
    evaluation.report,
    original_text,
    evaluation.recognized_text,
  )))
}

/// `GET /api/history/:user_id`
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<HistoryOut>, ApiError> {
  let records = state.store.list_records(&user_id).await?;
  Ok(Json(HistoryOut { success: true, records }))
}

/// `DELETE /api/history/:user_id/:record_id`
#[instrument(level = "info", skip(state), fields(%user_id, %record_id))]
pub async fn http_delete_record(
  State(state): State<Arc<AppState>>,
  Path((user_id, record_id)): Path<(String, String)>,
) -> Result<Json<DeletedOut>, ApiError> {
  if !state.store.delete_record(&user_id, &record_id).await? {
    return Err(ApiError::not_found(format!("Unknown record: {record_id}")));
  }
  Ok(Json(DeletedOut { success: true }))
}

/// `GET /api/profile/:user_id`
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_profile(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<ProfileOut>, ApiError> {
  let profile = state
    .store
    .get_profile(&user_id)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("Unknown user: {user_id}")))?;
  Ok(Json(ProfileOut { success: true, profile }))
}

/// `POST /api/profile` — upsert.
#[instrument(level = "info", skip(state, body), fields(%body.user_id))]
pub async fn http_post_profile(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProfileIn>,
) -> Result<Json<ProfileOut>, ApiError> {
  if body.user_id.trim().is_empty() {
    return Err(ApiError::validation("userId must not be empty"));
  }
  let created_at = state
    .store
    .get_profile(&body.user_id)
    .await?
    .map(|p| p.created_at)
    .unwrap_or_else(Utc::now);
  let profile = UserProfile {
    user_id: body.user_id,
    nickname: body.nickname,
    level: body.level,
    created_at,
  };
  state.store.upsert_profile(profile.clone()).await?;
  Ok(Json(ProfileOut { success: true, profile }))
}

/// `GET /api/stats/:user_id` — zeroed snapshot for unseen users.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_stats(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<StatsOut>, ApiError> {
  let statistics = state
    .store
    .get_statistics(&user_id)
    .await?
    .unwrap_or_else(|| UserStatistics::new(&user_id));
  Ok(Json(StatsOut { success: true, statistics }))
}

/// `GET /api/achievements/:user_id`
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_achievements(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<AchievementsOut>, ApiError> {
  let stats = state.store.get_statistics(&user_id).await?;
  Ok(Json(AchievementsOut {
    success: true,
    achievements: achievements_for(stats.as_ref()),
  }))
}

/// `POST /api/share` — create a 30-day share link for a learning record.
#[instrument(level = "info", skip(state, body), fields(%body.record_id, %body.user_id))]
pub async fn http_post_share(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ShareIn>,
) -> Result<Json<ShareOut>, ApiError> {
  let record = state
    .store
    .get_record(&body.record_id)
    .await?
    .filter(|r| r.user_id == body.user_id)
    .ok_or_else(|| ApiError::not_found(format!("Unknown record: {}", body.record_id)))?;

  let now = Utc::now();
  let share = ShareRecord {
    code: random_share_code(),
    record_id: record.id,
    user_id: body.user_id,
    created_at: now,
    expires_at: now + Duration::days(SHARE_EXPIRY_DAYS),
  };
  state.store.create_share(share.clone()).await?;
  info!(target: "lingsnap_backend", code = %share.code, "Share link created");

  Ok(Json(ShareOut {
    success: true,
    code: share.code,
    expires_at: share.expires_at,
  }))
}

/// `GET /api/share/:code` — resolve an unexpired share link.
#[instrument(level = "info", skip(state), fields(%code))]
pub async fn http_get_share(
  State(state): State<Arc<AppState>>,
  Path(code): Path<String>,
) -> Result<Json<SharedRecordOut>, ApiError> {
  let share = state
    .store
    .get_share(&code)
    .await?
    .filter(|s| !s.is_expired(Utc::now()))
    .ok_or_else(|| ApiError::not_found("Share link missing or expired"))?;

  let record = state
    .store
    .get_record(&share.record_id)
    .await?
    .ok_or_else(|| ApiError::not_found("Shared record no longer exists"))?;

  Ok(Json(SharedRecordOut { success: true, record }))
}
