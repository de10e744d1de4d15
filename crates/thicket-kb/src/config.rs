//! Configuration for the Thicket entity store
//!
//! Values are layered, lowest precedence first: built-in defaults, an optional
//! YAML file, a `.env` file, then `THICKET_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::data::{CoreError, Result};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThicketConfig {
    /// `tracing` filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Embedding model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Token budget per document; `None` means unlimited
    #[serde(default)]
    pub max_tokens: Option<usize>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

/// Text-generation model and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Cost per prompt token
    #[serde(default)]
    pub prompt_rate: f64,

    /// Cost per completion token
    #[serde(default)]
    pub completion_rate: f64,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_embedding_model() -> String {
    "hash-embedding".to_string()
}

fn default_dimension() -> usize {
    64
}

fn default_generation_model() -> String {
    "scripted".to_string()
}

impl Default for ThicketConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            max_tokens: None,
            dimension: default_dimension(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            prompt_rate: 0.0,
            completion_rate: 0.0,
        }
    }
}

impl ThicketConfig {
    /// Load configuration from an optional YAML file, `.env` and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };

        dotenv::dotenv().ok();
        config.apply_env_overrides();

        info!(
            embedding_model = %config.embedding.model,
            generation_model = %config.generation.model,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CoreError::Config(format!("invalid YAML: {}", e)))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Override fields from `THICKET_*` variables. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(filter) = env::var("THICKET_LOG_FILTER") {
            self.log_filter = filter;
        }

        if let Ok(json) = env::var("THICKET_JSON_LOGS") {
            self.json_logs = json.to_lowercase() == "true" || json == "1";
        }

        if let Ok(model) = env::var("THICKET_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(max_tokens) = env::var("THICKET_EMBEDDING_MAX_TOKENS") {
            if max_tokens.to_lowercase() == "none" {
                self.embedding.max_tokens = None;
            } else if let Ok(limit) = max_tokens.parse::<usize>() {
                self.embedding.max_tokens = Some(limit);
            } else {
                warn!("Invalid THICKET_EMBEDDING_MAX_TOKENS value: {}", max_tokens);
            }
        }

        if let Ok(dimension) = env::var("THICKET_EMBEDDING_DIMENSION") {
            match dimension.parse::<usize>() {
                Ok(d) if d > 0 => self.embedding.dimension = d,
                _ => warn!("Invalid THICKET_EMBEDDING_DIMENSION value: {}", dimension),
            }
        }

        if let Ok(model) = env::var("THICKET_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Ok(rate) = env::var("THICKET_PROMPT_RATE") {
            if let Ok(rate) = rate.parse::<f64>() {
                self.generation.prompt_rate = rate;
            } else {
                warn!("Invalid THICKET_PROMPT_RATE value: {}", rate);
            }
        }

        if let Ok(rate) = env::var("THICKET_COMPLETION_RATE") {
            if let Ok(rate) = rate.parse::<f64>() {
                self.generation.completion_rate = rate;
            } else {
                warn!("Invalid THICKET_COMPLETION_RATE value: {}", rate);
            }
        }
    }
}
