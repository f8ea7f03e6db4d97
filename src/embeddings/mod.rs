//! Text embedding providers.
//!
//! - **Hashing**: offline bag-of-words feature hashing. Deterministic, no network.
//! - **Http**: any OpenAI-compatible `/embeddings` endpoint (OpenAI, Together, ...).

mod hashing;
mod http;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, EmbeddingError};

/// Default dimensionality for the hashing embedder.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 512;

/// A text embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name, used in logs and errors.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Supported embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Hashing,
    Http,
}

impl FromStr for EmbeddingBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" | "local" => Ok(Self::Hashing),
            "http" | "openai" => Ok(Self::Http),
            other => Err(ConfigError::InvalidValue {
                key: "REPLY_ASSIST_EMBEDDING_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected hashing or http)"),
            }),
        }
    }
}

/// Configuration for creating an embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Base URL of the OpenAI-compatible API (without `/embeddings`).
    pub base_url: String,
    pub model: String,
    pub api_key: Option<secrecy::SecretString>,
    /// Vector size for the hashing backend.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimensions: DEFAULT_HASHING_DIMENSIONS,
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match std::env::var("REPLY_ASSIST_EMBEDDING_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.backend,
        };

        let api_key = std::env::var("REPLY_ASSIST_EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .map(secrecy::SecretString::from);

        if backend == EmbeddingBackend::Http && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "REPLY_ASSIST_EMBEDDING_API_KEY".to_string(),
            ));
        }

        let dimensions = std::env::var("REPLY_ASSIST_EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.dimensions);
        if dimensions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REPLY_ASSIST_EMBEDDING_DIMENSIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            backend,
            base_url: std::env::var("REPLY_ASSIST_EMBEDDING_URL").unwrap_or(defaults.base_url),
            model: std::env::var("REPLY_ASSIST_EMBEDDING_MODEL").unwrap_or(defaults.model),
            api_key,
            dimensions,
        })
    }
}

/// Create an embedding provider from configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    match config.backend {
        EmbeddingBackend::Hashing => {
            tracing::info!("Using hashing embedder ({} dimensions)", config.dimensions);
            Ok(Arc::new(HashingEmbedder::new(config.dimensions)))
        }
        EmbeddingBackend::Http => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("REPLY_ASSIST_EMBEDDING_API_KEY".to_string()))?;
            tracing::info!("Using HTTP embeddings (model: {}, url: {})", config.model, config.base_url);
            Ok(Arc::new(HttpEmbedder::new(&config.base_url, &config.model, api_key)))
        }
    }
}
