//! Minimal OpenAI-compatible client for our use-cases.
//!
//! We call chat.completions (text and vision), audio/speech, and
//! audio/transcriptions. Chat calls request either plain text or a strict
//! JSON object. Calls are instrumented and log model names, latencies, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to
//! avoid PII leaks.

use std::time::Duration;

use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::Story;
use crate::util::fill_template;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub vision_model: String,
  pub tts_model: String,
  pub tts_voice: String,
  pub transcribe_model: String,
}

#[derive(Deserialize)]
struct StoryGen {
  mandarin: String,
  cantonese: String,
  #[serde(default)]
  words: Vec<WordGen>,
}

#[derive(Deserialize)]
struct WordGen {
  #[serde(rename = "char")]
  hanzi: String,
  #[serde(default)]
  pinyin: String,
  #[serde(default)]
  jyutping: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let vision_model =
      std::env::var("OPENAI_VISION_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let tts_model = std::env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "tts-1".into());
    let tts_voice = std::env::var("OPENAI_TTS_VOICE").unwrap_or_else(|_| "alloy".into());
    let transcribe_model =
      std::env::var("OPENAI_TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url,
      fast_model,
      vision_model,
      tts_model,
      tts_voice,
      transcribe_model,
    })
  }

  /// Plain-text chat completion. Used for the translate fallback leg.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: serde_json::Value,
    temperature: f32,
  ) -> Result<String, String> {
    let text = self.chat_raw(model, system, user, temperature, false).await?;
    Ok(text.trim().to_string())
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: serde_json::Value,
    temperature: f32,
  ) -> Result<T, String> {
    let text = self.chat_raw(model, system, user, temperature, true).await?;
    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  /// Shared chat.completions call. `user` is the user-message content:
  /// either a plain string or a vision parts array.
  async fn chat_raw(
    &self,
    model: &str,
    system: &str,
    user: serde_json::Value,
    temperature: f32,
    want_json: bool,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: json!(system) },
        ChatMessageReq { role: "user".into(), content: user },
      ],
      temperature,
      response_format: if want_json {
        Some(ResponseFormat { r#type: "json_object".into() })
      } else {
        None
      },
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "lingsnap-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Primary generation path: photo → bilingual story, strict JSON.
  #[instrument(
    level = "info",
    skip(self, prompts, image_bytes),
    fields(%level, model = %self.vision_model, image_len = image_bytes.len())
  )]
  pub async fn describe_image_bilingual(
    &self,
    prompts: &Prompts,
    image_bytes: &[u8],
    mime: &str,
    level: &str,
  ) -> Result<Story, String> {
    let user_text = fill_template(&prompts.story_user_template, &[("level", level)]);
    let user = vision_parts(&user_text, image_bytes, mime);

    let start = std::time::Instant::now();
    let result = self
      .chat_json::<StoryGen>(&self.vision_model, &prompts.story_system, user, 0.8)
      .await;
    let elapsed = start.elapsed();

    let gen = match result {
      Ok(g) => {
        info!(?elapsed, "Bilingual story received");
        g
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during story generation");
        return Err(format!("Story generation failed: {e}"));
      }
    };

    if gen.mandarin.trim().is_empty() {
      return Err("Story generation returned an empty mandarin field".into());
    }

    Ok(Story {
      mandarin: gen.mandarin,
      cantonese: gen.cantonese,
      words: gen
        .words
        .into_iter()
        .filter(|w| !w.hanzi.is_empty())
        .map(|w| crate::domain::WordEntry { hanzi: w.hanzi, pinyin: w.pinyin, jyutping: w.jyutping })
        .collect(),
    })
  }

  /// Fallback leg 1: plain Mandarin description of the photo.
  #[instrument(level = "info", skip(self, prompts, image_bytes), fields(model = %self.vision_model, image_len = image_bytes.len()))]
  pub async fn describe_image(
    &self,
    prompts: &Prompts,
    image_bytes: &[u8],
    mime: &str,
  ) -> Result<String, String> {
    let user = vision_parts("请描述这张照片。", image_bytes, mime);
    self.chat_plain(&self.vision_model, &prompts.describe_system, user, 0.5).await
  }

  /// Fallback leg 2: Mandarin → colloquial written Cantonese.
  #[instrument(level = "info", skip(self, prompts, text), fields(text_len = text.len()))]
  pub async fn translate_to_cantonese(&self, prompts: &Prompts, text: &str) -> Result<String, String> {
    let input = text.trim();
    if input.is_empty() {
      return Ok(String::new());
    }
    self
      .chat_plain(&self.fast_model, &prompts.translate_cantonese_system, json!(input), 0.0)
      .await
  }

  /// Synthesize speech for `text`, returning MP3 bytes.
  #[instrument(level = "info", skip(self, text), fields(model = %self.tts_model, voice = %self.tts_voice, text_len = text.len()))]
  pub async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, String> {
    let url = format!("{}/audio/speech", self.base_url);
    let req = json!({
      "model": self.tts_model,
      "voice": self.tts_voice,
      "input": text,
      "response_format": "mp3",
    });

    let res = self.client.post(&url)
      .header(USER_AGENT, "lingsnap-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let bytes = res.bytes().await.map_err(|e| e.to_string())?;
    info!(audio_len = bytes.len(), "Speech synthesized");
    Ok(bytes.to_vec())
  }

  /// Transcribe speech, returning the recognized text and a confidence in
  /// [0,1]. Confidence is exp(mean segment avg_logprob); when the response
  /// carries no segments we fall back to 0.8.
  #[instrument(level = "info", skip(self, audio_bytes), fields(model = %self.transcribe_model, audio_len = audio_bytes.len(), %filename))]
  pub async fn transcribe(
    &self,
    audio_bytes: Vec<u8>,
    filename: &str,
    language: &str,
  ) -> Result<(String, f64), String> {
    let url = format!("{}/audio/transcriptions", self.base_url);

    let part = reqwest::multipart::Part::bytes(audio_bytes)
      .file_name(filename.to_string());
    let form = reqwest::multipart::Form::new()
      .part("file", part)
      .text("model", self.transcribe_model.clone())
      .text("response_format", "verbose_json")
      .text("language", language.to_string());

    let res = self.client.post(&url)
      .header(USER_AGENT, "lingsnap-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: TranscriptionResponse = res.json().await.map_err(|e| e.to_string())?;
    let confidence = confidence_from_segments(&body.segments);
    info!(text_len = body.text.len(), confidence, "Transcription received");
    Ok((body.text.trim().to_string(), confidence))
  }
}

/// Vision user-message content: text part plus a base64 data-URL image.
fn vision_parts(text: &str, image_bytes: &[u8], mime: &str) -> serde_json::Value {
  let b64 = base64::engine::general_purpose::STANDARD.encode(image_bytes);
  json!([
    { "type": "text", "text": text },
    { "type": "image_url", "image_url": { "url": format!("data:{};base64,{}", mime, b64) } },
  ])
}

/// Map whisper-style segment log-probabilities onto [0,1].
fn confidence_from_segments(segments: &[TranscriptionSegment]) -> f64 {
  if segments.is_empty() {
    return 0.8;
  }
  let mean: f64 =
    segments.iter().map(|s| s.avg_logprob).sum::<f64>() / segments.len() as f64;
  mean.exp().clamp(0.0, 1.0)
}

// --- API DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: serde_json::Value }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
  #[serde(default)]
  text: String,
  #[serde(default)]
  segments: Vec<TranscriptionSegment>,
}
#[derive(Deserialize)]
struct TranscriptionSegment {
  #[serde(default)]
  avg_logprob: f64,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
