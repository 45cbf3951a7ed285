use crate::store::{MetadataStore, StoreError};
use async_trait::async_trait;
use common_types::{CollectionMeta, MediaMeta};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-memory metadata store, used by tests and single-node setups.
#[derive(Default)]
pub struct MemoryStore {
    media: RwLock<HashMap<String, MediaMeta>>,
    collections: RwLock<HashMap<String, CollectionMeta>>,
    favorites: RwLock<HashMap<i32, HashSet<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_media(&self, meta: MediaMeta) {
        self.media
            .write()
            .expect("media lock poisoned")
            .insert(meta.id.clone(), meta);
    }

    /// Drop a metadata record, simulating a soft delete after indexing.
    pub fn remove_media(&self, id: &str) {
        self.media.write().expect("media lock poisoned").remove(id);
    }

    pub fn insert_collection(&self, collection: CollectionMeta) {
        self.collections
            .write()
            .expect("collections lock poisoned")
            .insert(collection.id.clone(), collection);
    }

    pub fn set_favorites<I, S>(&self, user_id: i32, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorites
            .write()
            .expect("favorites lock poisoned")
            .insert(user_id, ids.into_iter().map(Into::into).collect());
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<MediaMeta>, StoreError> {
        let media = self.media.read().expect("media lock poisoned");
        Ok(ids.iter().filter_map(|id| media.get(id).cloned()).collect())
    }

    async fn collection(&self, collection_id: &str) -> Result<Option<CollectionMeta>, StoreError> {
        Ok(self
            .collections
            .read()
            .expect("collections lock poisoned")
            .get(collection_id)
            .cloned())
    }

    async fn favorites(&self, user_id: i32) -> Result<Vec<String>, StoreError> {
        Ok(self
            .favorites
            .read()
            .expect("favorites lock poisoned")
            .get(&user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }
}
