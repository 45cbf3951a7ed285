use crate::error::SearchError;
use crate::scope::Scope;
use app_state::SearchSettings;
use common_types::{MediaMeta, MediaType, Visibility};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A fully materialized result entry, as served to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: String,
    pub media_url: String,
    pub thumbnail_url: Option<String>,
    pub media_type: MediaType,
    pub similarity_score: Option<f32>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub owner_id: Option<i32>,
}

impl SearchItem {
    #[must_use]
    pub fn from_meta(meta: MediaMeta, score: f32) -> Self {
        Self {
            id: meta.id,
            media_url: meta.media_url,
            thumbnail_url: meta.thumbnail_url,
            media_type: meta.media_type,
            similarity_score: Some(score),
            title: meta.title,
            tags: meta.tags,
            visibility: meta.visibility,
            owner_id: meta.owner_id,
        }
    }
}

/// One page of a query session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    /// Re-entry key for subsequent pages of the same logical query.
    pub query_id: String,
    pub items: Vec<SearchItem>,
    /// Best-effort estimate; exact once the session is fully materialized.
    pub total: usize,
    /// Authoritative: whether unfetched candidates remain.
    pub has_more: bool,
    pub search_time_ms: f64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct TextSearchParams {
    pub query: String,
    #[serde(default)]
    pub scope: Scope,
    pub collection_id: Option<String>,
    /// Minimum similarity score, 0.0 to 1.0.
    pub threshold: Option<f32>,
    /// Comma-separated tag list; an item matches when it carries any of them.
    pub tags: Option<String>,
    pub content_type: Option<MediaType>,
    pub page: Option<u32>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct ImageSearchParams {
    #[serde(default)]
    pub scope: Scope,
    pub collection_id: Option<String>,
    pub threshold: Option<f32>,
    pub tags: Option<String>,
    pub content_type: Option<MediaType>,
    pub page: Option<u32>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct SimilarParams {
    pub scope: Option<Scope>,
    pub collection_id: Option<String>,
    pub threshold: Option<f32>,
    pub tags: Option<String>,
    pub content_type: Option<MediaType>,
    pub page: Option<u32>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<usize>,
}

/// Validated `(page, page_size)` pair.
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub page: u32,
    pub page_size: usize,
}

impl Paging {
    /// Apply defaults and bounds from settings.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `page` is zero or `page_size` is out of bounds.
    pub fn resolve(
        page: Option<u32>,
        page_size: Option<usize>,
        settings: &SearchSettings,
    ) -> Result<Self, SearchError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(SearchError::BadRequest("page must be >= 1".into()));
        }
        let page_size = page_size.unwrap_or(settings.default_page_size);
        if page_size == 0 || page_size > settings.max_page_size {
            return Err(SearchError::BadRequest(format!(
                "page_size must be between 1 and {}",
                settings.max_page_size
            )));
        }
        Ok(Self { page, page_size })
    }
}
