//! Similarity retrieval over the reference corpora.

mod builtin;
pub mod corpora;
pub mod index;

pub use corpora::{
    CorpusDocument, CorpusFile, CorpusKind, EXAMPLE_SENTINEL, POLICY_SENTINEL, ReferenceCorpora,
};
pub use index::{RetrievalHit, RetrievalResult, SimilarityIndex, cosine_similarity};
