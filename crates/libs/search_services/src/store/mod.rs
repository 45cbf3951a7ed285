use async_trait::async_trait;
use common_types::{CollectionMeta, MediaMeta};
use thiserror::Error;

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgMetadataStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    #[error("metadata query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Read-only view over item metadata, collection membership and saved sets.
///
/// The search core never writes through this interface; ingestion owns the
/// data. Missing metadata for an indexed id means the item was soft-deleted
/// after indexing.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch metadata for the given ids. Missing ids are simply absent from
    /// the result; order is unspecified.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<MediaMeta>, StoreError>;

    async fn collection(&self, collection_id: &str) -> Result<Option<CollectionMeta>, StoreError>;

    /// The requester's saved set, used by the favorites scope.
    async fn favorites(&self, user_id: i32) -> Result<Vec<String>, StoreError>;
}
