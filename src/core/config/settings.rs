//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so a missing or partial `config.yml` still yields
//! a usable [`Settings`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_MODEL: &str = "exaone3.5:7.8b";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub chat_model: String,
    /// Model used for keyword extraction and document summaries.
    pub keyword_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            chat_model: DEFAULT_MODEL.to_string(),
            keyword_model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            request_timeout_secs: 120,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub context_documents: usize,
    pub summary_preview_chars: usize,
    pub lookup_timeout_ms: u64,
    pub history_limit: i64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            context_documents: 10,
            summary_preview_chars: 100,
            lookup_timeout_ms: 2_000,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_summary_chars: usize,
    pub max_input_chars: usize,
    pub max_source_chunks: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            max_summary_chars: 1_000,
            max_input_chars: 12_000,
            max_source_chunks: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Builds settings from the merged config value, falling back to defaults
    /// when the value does not deserialize.
    pub fn from_value(config: &Value) -> Self {
        match serde_json::from_value::<Settings>(config.clone()) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("Invalid configuration, using defaults: {}", err);
                Settings::default()
            }
        }
    }
}
