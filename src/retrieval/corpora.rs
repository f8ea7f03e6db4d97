//! The two reference corpora every pipeline retrieves from.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::builtin;
use super::index::SimilarityIndex;
use crate::embeddings::EmbeddingProvider;
use crate::error::{ConfigError, Result, RetrievalError};

/// Rendered when no policy clears the threshold.
pub const POLICY_SENTINEL: &str = "No relevant policy found.";

/// Rendered when no past response clears the threshold.
pub const EXAMPLE_SENTINEL: &str = "No relevant example found.";

/// Which corpus a prompt input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorpusKind {
    Policies,
    Examples,
}

impl CorpusKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Policies => "policies",
            Self::Examples => "examples",
        }
    }

    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::Policies => POLICY_SENTINEL,
            Self::Examples => EXAMPLE_SENTINEL,
        }
    }
}

/// A labeled reference document in a corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub label: String,
    pub text: String,
}

/// On-disk corpus format. Arrays keep the tie-break order stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub policies: Vec<CorpusDocument>,
    #[serde(default)]
    pub examples: Vec<CorpusDocument>,
}

/// Policy and past-response indexes, shared read-only.
#[derive(Debug, Clone)]
pub struct ReferenceCorpora {
    policies: Arc<SimilarityIndex>,
    examples: Arc<SimilarityIndex>,
}

impl ReferenceCorpora {
    /// Wrap two prebuilt indexes.
    pub fn new(policies: Arc<SimilarityIndex>, examples: Arc<SimilarityIndex>) -> Self {
        Self { policies, examples }
    }

    /// Embed both corpora with `embedder`.
    pub async fn build<P, E, L, T>(
        policies: P,
        examples: E,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> std::result::Result<Self, RetrievalError>
    where
        P: IntoIterator<Item = (L, T)>,
        E: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let policies = SimilarityIndex::build(
            CorpusKind::Policies.name(),
            POLICY_SENTINEL,
            policies,
            Arc::clone(&embedder),
        )
        .await?;
        let examples = SimilarityIndex::build(
            CorpusKind::Examples.name(),
            EXAMPLE_SENTINEL,
            examples,
            embedder,
        )
        .await?;

        info!(
            policies = policies.len(),
            examples = examples.len(),
            "Reference corpora ready"
        );

        Ok(Self::new(Arc::new(policies), Arc::new(examples)))
    }

    /// The built-in medical practice corpora.
    pub async fn builtin(
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> std::result::Result<Self, RetrievalError> {
        Self::build(
            builtin::POLICIES.iter().copied(),
            builtin::EXAMPLES.iter().copied(),
            embedder,
        )
        .await
    }

    /// Load corpora from a JSON [`CorpusFile`].
    pub async fn from_json_file(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        let file: CorpusFile = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "Loading reference corpora from file");

        let corpora = Self::build(
            file.policies.into_iter().map(|d| (d.label, d.text)),
            file.examples.into_iter().map(|d| (d.label, d.text)),
            embedder,
        )
        .await?;
        Ok(corpora)
    }

    pub fn policies(&self) -> &Arc<SimilarityIndex> {
        &self.policies
    }

    pub fn examples(&self) -> &Arc<SimilarityIndex> {
        &self.examples
    }

    pub fn get(&self, kind: CorpusKind) -> &Arc<SimilarityIndex> {
        match kind {
            CorpusKind::Policies => &self.policies,
            CorpusKind::Examples => &self.examples,
        }
    }
}
