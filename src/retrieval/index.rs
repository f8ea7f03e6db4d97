//! Embedding similarity index over a small, fixed corpus.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::error::RetrievalError;

/// One corpus member with its precomputed embedding.
#[derive(Debug, Clone)]
struct CorpusEntry {
    label: String,
    text: String,
    embedding: Vec<f32>,
}

/// A scored corpus entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub label: String,
    pub score: f32,
    pub text: String,
}

/// Relevant entries for a query, best first.
///
/// Renders as the entry texts separated by a blank line, or as the corpus
/// sentinel when no entry cleared the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    hits: Vec<RetrievalHit>,
    sentinel: String,
}

impl RetrievalResult {
    fn empty(sentinel: &str) -> Self {
        Self {
            hits: Vec::new(),
            sentinel: sentinel.to_string(),
        }
    }

    pub fn hits(&self) -> &[RetrievalHit] {
        &self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.label.as_str()).collect()
    }

    /// Text ready for prompt interpolation.
    pub fn to_prompt_text(&self) -> String {
        if self.hits.is_empty() {
            return self.sentinel.clone();
        }
        self.hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for RetrievalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_prompt_text())
    }
}

/// Read-only similarity index.
///
/// Entries are embedded once in [`SimilarityIndex::build`] and never change
/// afterwards, so an index can be shared behind an `Arc` without locking.
pub struct SimilarityIndex {
    name: String,
    sentinel: String,
    entries: Vec<CorpusEntry>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl SimilarityIndex {
    /// Embed every entry and build the index. Entry order is preserved and
    /// breaks score ties at query time.
    pub async fn build<I, L, T>(
        name: &str,
        sentinel: &str,
        entries: I,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RetrievalError>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut built: Vec<CorpusEntry> = Vec::new();

        for (label, text) in entries {
            let label = label.into();
            let text = text.into();
            if !seen.insert(label.clone()) {
                return Err(RetrievalError::DuplicateLabel {
                    corpus: name.to_string(),
                    label,
                });
            }

            let embedding = embedder
                .embed(&text)
                .await
                .map_err(|source| RetrievalError::Embedding {
                    corpus: name.to_string(),
                    source,
                })?;

            if let Some(first) = built.first()
                && first.embedding.len() != embedding.len()
            {
                return Err(RetrievalError::DimensionMismatch {
                    corpus: name.to_string(),
                    expected: first.embedding.len(),
                    actual: embedding.len(),
                });
            }

            built.push(CorpusEntry {
                label,
                text,
                embedding,
            });
        }

        debug!(corpus = name, entries = built.len(), embedder = embedder.name(), "Built similarity index");

        Ok(Self {
            name: name.to_string(),
            sentinel: sentinel.to_string(),
            entries: built,
            embedder,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    /// Score every entry against `query`, best first (stable on ties).
    ///
    /// An empty index returns no hits without calling the embedder.
    pub async fn rank(&self, query: &str) -> Result<Vec<RetrievalHit>, RetrievalError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding =
            self.embedder
                .embed(query)
                .await
                .map_err(|source| RetrievalError::Embedding {
                    corpus: self.name.clone(),
                    source,
                })?;

        let expected = self.entries[0].embedding.len();
        if query_embedding.len() != expected {
            return Err(RetrievalError::DimensionMismatch {
                corpus: self.name.clone(),
                expected,
                actual: query_embedding.len(),
            });
        }

        let mut hits: Vec<RetrievalHit> = self
            .entries
            .iter()
            .map(|entry| RetrievalHit {
                label: entry.label.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
                text: entry.text.clone(),
            })
            .collect();

        // `sort_by` is stable: equal scores keep insertion order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }

    /// Top `k` entries scoring strictly above `threshold`.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<RetrievalResult, RetrievalError> {
        if self.entries.is_empty() {
            return Ok(RetrievalResult::empty(&self.sentinel));
        }

        let mut hits = self.rank(query).await?;
        hits.truncate(k.min(self.entries.len()));
        hits.retain(|h| h.score > threshold);

        debug!(
            corpus = %self.name,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score).unwrap_or_default(),
            "Retrieved reference snippets"
        );

        Ok(RetrievalResult {
            hits,
            sentinel: self.sentinel.clone(),
        })
    }
}

/// Cosine similarity; 0.0 when either vector has no magnitude or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}
