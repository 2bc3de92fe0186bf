//! Loading agent configuration (prompt overrides) from TOML.
//!
//! See `AgentConfig` and `Prompts` for the expected schema. Everything has
//! a working default; the TOML file only exists for prompt tuning.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the OpenAI client. Defaults are sensible for bilingual
/// (Mandarin/Cantonese) story generation; override in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Photo → bilingual story (primary path, strict JSON)
  pub story_system: String,
  pub story_user_template: String,
  // Fallback path: plain description, then translation
  pub describe_system: String,
  pub translate_cantonese_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      story_system: "You are a Chinese learning content generator for photo-based stories. Respond ONLY with strict JSON: {\"mandarin\": string, \"cantonese\": string, \"words\": [{\"char\": string, \"pinyin\": string, \"jyutping\": string}]}. The mandarin field is a short Simplified Chinese story (2-3 sentences) describing the photo; cantonese is the same story in colloquial written Cantonese. words annotates each distinct Han character in the mandarin text.".into(),
      story_user_template: "Describe this photo as a short story for a learner at level '{level}'. Keep sentences simple and natural.".into(),
      describe_system: "Describe the photo in 2-3 short, simple Simplified Chinese sentences suitable for a language learner. Output ONLY the Chinese text.".into(),
      translate_cantonese_system: "Translate the user's Simplified Chinese text into natural colloquial written Cantonese. Output ONLY the Cantonese text.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO
/// error, returns None and the defaults apply.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "lingsnap_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "lingsnap_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "lingsnap_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
