use crate::embedding::Embedding;
use crate::scope::ScopeFilter;
use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod pg;

pub use memory::{IndexedMedia, MemoryIndex};
pub use pg::PgVectorIndex;

/// A ranked candidate returned by the index: `(item id, score)` with the
/// score normalized to `[0, 1]`, higher = more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub media_id: String,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Transient, retryable by the caller. No session mutation occurs on
    /// this failure, so a retry is safe.
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
    #[error("index query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl IndexError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Approximate/exact nearest-neighbor query surface.
///
/// Ordering must be deterministic for an unchanged index: descending by
/// score, ties broken by id ascending. The session manager's lazy
/// extension relies on this to make `after_rank` a stable cursor.
/// An empty index is not an error; it yields an empty result set.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `limit` candidates satisfying `filter`, skipping the
    /// first `after_rank` ranked matches.
    async fn query(
        &self,
        embedding: &Embedding,
        filter: &ScopeFilter,
        after_rank: usize,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, IndexError>;

    /// The stored embedding of an indexed item, for similar-by-id queries.
    async fn stored_embedding(&self, media_id: &str) -> Result<Option<Embedding>, IndexError>;
}
