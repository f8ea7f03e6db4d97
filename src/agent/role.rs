//! The closed set of agent roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::prompts;
use crate::error::AgentError;
use crate::retrieval::{CorpusKind, EXAMPLE_SENTINEL, POLICY_SENTINEL};

/// A pipeline role bound to one prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Analyzer,
    Drafter,
    CasualDrafter,
    Reviewer,
    Sentiment,
    PolicyJustifier,
    ExampleJustifier,
}

/// Retrieved reference text handed to a prompt template.
///
/// A corpus the role does not read stays `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub policies: Option<String>,
    pub examples: Option<String>,
}

impl PromptContext {
    fn policies(&self) -> &str {
        self.policies.as_deref().unwrap_or(POLICY_SENTINEL)
    }

    fn examples(&self) -> &str {
        self.examples.as_deref().unwrap_or(EXAMPLE_SENTINEL)
    }
}

impl AgentRole {
    pub const ALL: [AgentRole; 7] = [
        Self::Analyzer,
        Self::Drafter,
        Self::CasualDrafter,
        Self::Reviewer,
        Self::Sentiment,
        Self::PolicyJustifier,
        Self::ExampleJustifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzer => "analyzer",
            Self::Drafter => "drafter",
            Self::CasualDrafter => "casual_drafter",
            Self::Reviewer => "reviewer",
            Self::Sentiment => "sentiment",
            Self::PolicyJustifier => "policy_justifier",
            Self::ExampleJustifier => "example_justifier",
        }
    }

    /// Whether the template has a policies placeholder.
    pub fn uses_policies(&self) -> bool {
        matches!(
            self,
            Self::Analyzer | Self::Drafter | Self::Reviewer | Self::PolicyJustifier
        )
    }

    /// Whether the template has an examples placeholder.
    pub fn uses_examples(&self) -> bool {
        matches!(
            self,
            Self::Analyzer
                | Self::Drafter
                | Self::CasualDrafter
                | Self::Reviewer
                | Self::ExampleJustifier
        )
    }

    /// Corpora this role retrieves from, policies first.
    pub fn corpora(&self) -> Vec<CorpusKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.uses_policies() {
            kinds.push(CorpusKind::Policies);
        }
        if self.uses_examples() {
            kinds.push(CorpusKind::Examples);
        }
        kinds
    }

    /// Fill this role's template.
    pub fn build_prompt(&self, content: &str, context: &PromptContext) -> String {
        match self {
            Self::Analyzer => prompts::analyzer(content, context.policies(), context.examples()),
            Self::Drafter => prompts::drafter(content, context.policies(), context.examples()),
            Self::CasualDrafter => prompts::casual_drafter(content, context.examples()),
            Self::Reviewer => prompts::reviewer(content, context.policies(), context.examples()),
            Self::Sentiment => prompts::sentiment(content),
            Self::PolicyJustifier => prompts::policy_justifier(content, context.policies()),
            Self::ExampleJustifier => prompts::example_justifier(content, context.examples()),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| AgentError::UnknownRole(s.to_string()))
    }
}
