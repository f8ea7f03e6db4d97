//! Error types for Reply Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Embedding provider errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid embedding response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for embedding provider {provider}")]
    AuthFailed { provider: String },
}

/// Similarity index errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Embedding failed for corpus {corpus}: {source}")]
    Embedding {
        corpus: String,
        #[source]
        source: EmbeddingError,
    },

    #[error("Duplicate label '{label}' in corpus {corpus}")]
    DuplicateLabel { corpus: String, label: String },

    #[error("Embedding dimension mismatch in corpus {corpus}: expected {expected}, got {actual}")]
    DimensionMismatch {
        corpus: String,
        expected: usize,
        actual: usize,
    },
}

/// Agent construction and execution errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Unknown agent role: '{0}'")]
    UnknownRole(String),

    #[error("Agent {role} requires the {corpus} corpus but none was provided")]
    MissingCorpus { role: String, corpus: String },

    #[error("Agent {role} retrieval failed: {source}")]
    Retrieval {
        role: String,
        #[source]
        source: RetrievalError,
    },

    #[error("Agent {role} generation failed: {source}")]
    Generation {
        role: String,
        #[source]
        source: LlmError,
    },
}

/// Email input errors.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email is empty")]
    Empty,

    #[error("Could not parse message: {0}")]
    Unparseable(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
