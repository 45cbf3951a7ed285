use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// Metadata record for an indexed media item, as read by the search core.
///
/// Owned by the storage/indexing subsystem; the search core only reads it.
/// An id that exists in the vector index but has no metadata record is a
/// soft-deleted item and gets dropped during materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaMeta {
    pub id: String,
    pub owner_id: Option<i32>,
    pub visibility: Visibility,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub media_url: String,
    pub thumbnail_url: Option<String>,
}

/// A collection (board) of media items, read for scope resolution only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub id: String,
    pub owner_id: i32,
    pub is_public: bool,
    pub member_ids: Vec<String>,
}

impl CollectionMeta {
    #[must_use]
    pub fn visible_to(&self, requester: Option<i32>) -> bool {
        self.is_public || requester == Some(self.owner_id)
    }
}
