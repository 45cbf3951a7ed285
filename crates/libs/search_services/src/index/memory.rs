use crate::embedding::Embedding;
use crate::index::{IndexError, RankedCandidate, VectorIndex};
use crate::scope::ScopeFilter;
use async_trait::async_trait;
use common_types::{SimilarityMetric, Visibility};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

/// An index entry: embedding plus the ownership metadata scope filters
/// evaluate against. Mirrors the fields the production index stores next
/// to each vector.
#[derive(Debug, Clone)]
pub struct IndexedMedia {
    pub id: String,
    pub embedding: Embedding,
    pub owner_id: Option<i32>,
    pub visibility: Visibility,
}

/// Exact-scan in-memory vector index for tests and small corpora.
pub struct MemoryIndex {
    metric: SimilarityMetric,
    items: RwLock<HashMap<String, IndexedMedia>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, item: IndexedMedia) {
        self.items
            .write()
            .expect("index lock poisoned")
            .insert(item.id.clone(), item);
    }

    pub fn remove(&self, id: &str) {
        self.items.write().expect("index lock poisoned").remove(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().expect("index lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(
        &self,
        embedding: &Embedding,
        filter: &ScopeFilter,
        after_rank: usize,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, IndexError> {
        let items = self.items.read().expect("index lock poisoned");
        let mut ranked: Vec<RankedCandidate> = items
            .values()
            .filter(|item| filter.matches(&item.id, item.owner_id, item.visibility))
            .map(|item| RankedCandidate {
                media_id: item.id.clone(),
                score: self.metric.score(embedding.as_slice(), item.embedding.as_slice()),
            })
            .collect();
        drop(items);

        // Descending score, ties by id ascending. total_cmp keeps the sort
        // deterministic even for NaN-free degenerate scores.
        ranked.sort_unstable_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.media_id.cmp(&b.media_id),
            other => other,
        });

        Ok(ranked.into_iter().skip(after_rank).take(limit).collect())
    }

    async fn stored_embedding(&self, media_id: &str) -> Result<Option<Embedding>, IndexError> {
        Ok(self
            .items
            .read()
            .expect("index lock poisoned")
            .get(media_id)
            .map(|item| item.embedding.clone()))
    }
}
