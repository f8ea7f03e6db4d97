//! Shared types for the reply pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::retrieval::RetrievalHit;

/// Message returned when every attempt was sent back for revision.
pub const MAX_ATTEMPTS_MESSAGE: &str = "maximum revision attempts reached";

/// Marker the reviewer emits to accept a draft.
pub const APPROVAL_MARKER: &str = "APPROVED";

// ── Inputs ──────────────────────────────────────────────────────────

/// Voice of the drafted reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Casual => "casual",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" | "formal" => Ok(Self::Professional),
            "casual" => Ok(Self::Casual),
            other => Err(ConfigError::InvalidValue {
                key: "tone".into(),
                message: format!("expected professional or casual, got '{other}'"),
            }),
        }
    }
}

// ── Run state ───────────────────────────────────────────────────────

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyze,
    Sentiment,
    Draft,
    Justify,
    Review,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Sentiment => "sentiment",
            Self::Draft => "draft",
            Self::Justify => "justify",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reviewer's decision, derived from its raw output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approved,
    NeedsRevision { feedback: String },
}

impl ReviewVerdict {
    /// Approved iff the review contains the approval marker anywhere.
    ///
    /// Note that "NOT APPROVED" also matches.
    pub fn classify(review: &str) -> Self {
        if review.contains(APPROVAL_MARKER) {
            Self::Approved
        } else {
            Self::NeedsRevision {
                feedback: review.to_string(),
            }
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Mutable state for one `process_email` call. Never outlives it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    /// 1-based; 0 before the first attempt starts.
    pub attempt: u32,
    pub max_attempts: u32,
    pub latest_draft: Option<String>,
    pub latest_verdict: Option<ReviewVerdict>,
}

impl PipelineRun {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            attempt: 0,
            max_attempts,
            latest_draft: None,
            latest_verdict: None,
        }
    }

    /// Start the next attempt. Returns false once the budget is spent.
    pub fn begin_attempt(&mut self) -> bool {
        if self.attempt >= self.max_attempts {
            return false;
        }
        self.attempt += 1;
        true
    }

    pub fn record_review(&mut self, draft: String, verdict: ReviewVerdict) {
        self.latest_draft = Some(draft);
        self.latest_verdict = Some(verdict);
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Everything produced by an approved attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseBundle {
    pub run_id: Uuid,
    /// Attempt on which the draft was approved.
    pub attempts: u32,
    pub tone: Tone,
    pub analysis: String,
    pub final_draft: String,
    pub review: String,
    /// Rendered policy snippets (or the sentinel) the analyzer saw.
    pub retrieved_policies: String,
    pub retrieved_examples: String,
    /// Scored hits behind the rendered snippets.
    #[serde(default)]
    pub policy_hits: Vec<RetrievalHit>,
    #[serde(default)]
    pub example_hits: Vec<RetrievalHit>,
    pub policy_justification: Option<String>,
    pub example_justification: Option<String>,
    pub sentiment: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Result of one `process_email` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The reviewer approved a draft.
    Success(ResponseBundle),
    /// Every attempt needed revision.
    Failed {
        message: String,
        attempts: u32,
        /// Review text from the last attempt.
        last_review: Option<String>,
    },
    /// An external call failed; the run stopped at `stage`.
    Error {
        stage: Stage,
        attempt: u32,
        message: String,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn bundle(&self) -> Option<&ResponseBundle> {
        match self {
            Self::Success(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failed { .. } => "failed",
            Self::Error { .. } => "error",
        }
    }
}
