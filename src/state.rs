//! Application state: the persistence backend, prompts, and OpenAI client.
//!
//! This module owns:
//!   - store selection (SQLite when DATABASE_URL is set, in-memory otherwise)
//!   - the prompts struct (from TOML or defaults)
//!   - the optional OpenAI client

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_agent_config_from_env, Prompts};
use crate::openai::OpenAI;
use crate::store::{MemoryStore, SqliteStore, Store, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, pick the store backend, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, StoreError> {
        let prompts = load_agent_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
            Ok(url) => Arc::new(SqliteStore::connect(&url).await?),
            Err(_) => {
                info!(target: "lingsnap_backend", "DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(
                target: "lingsnap_backend",
                base_url = %oa.base_url,
                vision_model = %oa.vision_model,
                fast_model = %oa.fast_model,
                tts_model = %oa.tts_model,
                transcribe_model = %oa.transcribe_model,
                "OpenAI enabled."
            );
        } else {
            info!(target: "lingsnap_backend", "OpenAI disabled (no OPENAI_API_KEY). Using seed story; evaluation requires the recognizer.");
        }

        Ok(Self { store, openai, prompts })
    }

    /// Test construction over an explicit store, no env access.
    #[allow(dead_code)]
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            openai: None,
            prompts: Prompts::default(),
        }
    }
}
