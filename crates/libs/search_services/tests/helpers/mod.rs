#![allow(dead_code)]

use app_state::SearchSettings;
use async_trait::async_trait;
use common_types::{MediaMeta, MediaType, SimilarityMetric, Visibility};
use search_services::embedding::{EmbedError, Embedding, EmbeddingProvider};
use search_services::index::{IndexError, IndexedMedia, MemoryIndex, RankedCandidate, VectorIndex};
use search_services::scope::ScopeFilter;
use search_services::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

pub fn test_settings() -> SearchSettings {
    SearchSettings {
        default_page_size: 10,
        max_page_size: 100,
        max_depth: 1000,
        fetch_batch: 50,
        max_backfill: 10,
        session_ttl_seconds: 900,
        sweep_interval_seconds: 60,
        metric: SimilarityMetric::Cosine,
        transient_retries: 0,
        retry_delay_ms: 1,
    }
}

pub fn meta(id: &str, owner_id: Option<i32>, visibility: Visibility) -> MediaMeta {
    MediaMeta {
        id: id.to_string(),
        owner_id,
        visibility,
        media_type: MediaType::Image,
        title: Some(format!("item {id}")),
        tags: vec!["test".into()],
        media_url: format!("/media/{id}/file"),
        thumbnail_url: Some(format!("/media/{id}/thumb")),
    }
}

/// The query vector all seeded corpora are ranked against.
pub fn query_embedding() -> Embedding {
    Embedding::new(vec![1.0, 0.0])
}

/// Embedding whose similarity to `query_embedding()` strictly decreases
/// with `rank`, so seeded ids rank in insertion order.
pub fn embedding_at_rank(rank: usize) -> Embedding {
    Embedding::new(vec![1.0, rank as f32 * 0.3])
}

/// Seed `n` public items `m01..mNN` with strictly decreasing scores. Ids
/// are zero-padded so lexicographic order matches rank order.
pub fn seed_corpus(n: usize) -> (Arc<MemoryIndex>, Arc<MemoryStore>) {
    let index = Arc::new(MemoryIndex::new(SimilarityMetric::Cosine));
    let store = Arc::new(MemoryStore::new());
    for i in 1..=n {
        let id = format!("m{i:02}");
        index.upsert(IndexedMedia {
            id: id.clone(),
            embedding: embedding_at_rank(i),
            owner_id: Some(1),
            visibility: Visibility::Public,
        });
        store.insert_media(meta(&id, Some(1), Visibility::Public));
    }
    (index, store)
}

/// Deterministic embedder for service-level tests.
pub struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Embedding, EmbedError> {
        Ok(query_embedding())
    }

    async fn embed_image(&self, _bytes: &[u8]) -> Result<Embedding, EmbedError> {
        Ok(query_embedding())
    }
}

/// Delegating index that sleeps before every query, widening the window in
/// which overlapping page calls can race on the same session.
pub struct SlowIndex {
    pub inner: Arc<MemoryIndex>,
    pub delay: Duration,
}

#[async_trait]
impl VectorIndex for SlowIndex {
    async fn query(
        &self,
        embedding: &Embedding,
        filter: &ScopeFilter,
        after_rank: usize,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, IndexError> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(embedding, filter, after_rank, limit).await
    }

    async fn stored_embedding(&self, media_id: &str) -> Result<Option<Embedding>, IndexError> {
        self.inner.stored_embedding(media_id).await
    }
}

/// Index stub that replays a fixed candidate sequence, duplicates and all,
/// the way a sharded approximate index might.
pub struct SequenceIndex {
    pub candidates: Vec<RankedCandidate>,
}

#[async_trait]
impl VectorIndex for SequenceIndex {
    async fn query(
        &self,
        _embedding: &Embedding,
        _filter: &ScopeFilter,
        after_rank: usize,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, IndexError> {
        Ok(self
            .candidates
            .iter()
            .skip(after_rank)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stored_embedding(&self, _media_id: &str) -> Result<Option<Embedding>, IndexError> {
        Ok(None)
    }
}
