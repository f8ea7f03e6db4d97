//! Configuration types.

use std::str::FromStr;

use crate::error::ConfigError;

/// Default number of snippets pulled from each corpus.
pub const DEFAULT_TOP_K: usize = 2;

/// Default minimum cosine similarity for a snippet to count as relevant.
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Default revision budget per email.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default token cap for every generation call.
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Retrieval parameters used by every agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    /// Maximum snippets taken from a corpus.
    pub top_k: usize,
    /// Snippets must score strictly above this.
    pub threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Sampling parameters forwarded to the generation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    /// `None` leaves the provider default in place.
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }
}

/// Optional informational stages.
///
/// Neither stage affects control flow; turning them off only saves calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOptions {
    pub sentiment: bool,
    pub justifications: bool,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            sentiment: true,
            justifications: true,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Attempts before the run is declared failed.
    pub max_attempts: u32,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub stages: StageOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            stages: StageOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `REPLY_ASSIST_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            max_attempts: env_or("REPLY_ASSIST_MAX_ATTEMPTS", defaults.max_attempts)?,
            retrieval: RetrievalConfig {
                top_k: env_or("REPLY_ASSIST_TOP_K", defaults.retrieval.top_k)?,
                threshold: env_or("REPLY_ASSIST_THRESHOLD", defaults.retrieval.threshold)?,
            },
            generation: GenerationConfig {
                max_tokens: env_or("REPLY_ASSIST_MAX_TOKENS", defaults.generation.max_tokens)?,
                temperature: env_opt("REPLY_ASSIST_TEMPERATURE")?,
            },
            stages: StageOptions {
                sentiment: env_flag("REPLY_ASSIST_SENTIMENT", defaults.stages.sentiment)?,
                justifications: env_flag("REPLY_ASSIST_JUSTIFY", defaults.stages.justifications)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.retrieval.top_k == 0 {
            return Err(invalid("top_k", "must be at least 1"));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(invalid("threshold", "must be within [-1, 1]"));
        }
        if self.generation.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be at least 1"));
        }
        if let Some(t) = self.generation.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(invalid("temperature", "must be within [0, 2]"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Parse an env var, returning `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    Ok(env_opt(key)?.unwrap_or(default))
}

fn env_opt<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, &format!("cannot parse '{raw}'"))),
        _ => Ok(None),
    }
}

fn env_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).ok_or_else(|| invalid(key, &format!("expected on/off, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
