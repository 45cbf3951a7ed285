use crate::error::SearchError;
use crate::store::MetadataStore;
use common_types::{MediaMeta, MediaType, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

/// Logical visibility scope of a search, as requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Public,
    Library,
    Favorites,
    Collection,
}

/// Concrete filter predicate a scope resolves to.
///
/// This is captured once per session, not re-resolved per page, so a
/// collection's membership changing mid-pagination cannot retroactively
/// alter already-delivered pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// `visibility == public`
    Public,
    /// `owner_id == requester` (any visibility)
    Owner(i32),
    /// `owner_id == requester AND id ∈ ids` (favorites snapshot)
    OwnedSet { owner_id: i32, ids: HashSet<String> },
    /// `id ∈ ids` (collection membership snapshot, access checked upfront)
    Members { ids: HashSet<String> },
}

impl ScopeFilter {
    /// Evaluate the predicate against an index entry.
    #[must_use]
    pub fn matches(&self, id: &str, owner_id: Option<i32>, visibility: Visibility) -> bool {
        match self {
            Self::Public => visibility == Visibility::Public,
            Self::Owner(requester) => owner_id == Some(*requester),
            Self::OwnedSet { owner_id: requester, ids } => {
                owner_id == Some(*requester) && ids.contains(id)
            }
            Self::Members { ids } => ids.contains(id),
        }
    }
}

/// Content filters applied on top of the scope, snapshotted per session.
///
/// The threshold cuts the ranked candidate stream: candidates arrive
/// score-descending, so the first one below it ends the session's ranked
/// list. Tag and media-type filters are evaluated against item metadata
/// during materialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    /// Minimum similarity score, in `[0, 1]`.
    pub threshold: Option<f32>,
    /// Keep items carrying at least one of these tags.
    pub tags: Vec<String>,
    pub media_type: Option<MediaType>,
}

impl SearchFilters {
    /// Build filters from request parameters. `tags` is the raw
    /// comma-separated query value.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `threshold` falls outside `[0, 1]`.
    pub fn from_params(
        threshold: Option<f32>,
        tags: Option<&str>,
        media_type: Option<MediaType>,
    ) -> Result<Self, SearchError> {
        if let Some(threshold) = threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(SearchError::BadRequest(
                    "threshold must be between 0 and 1".into(),
                ));
            }
        }
        let tags = tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            threshold,
            tags,
            media_type,
        })
    }

    /// Whether an item's metadata passes the tag and media-type filters.
    #[must_use]
    pub fn matches_meta(&self, meta: &MediaMeta) -> bool {
        if let Some(media_type) = self.media_type {
            if meta.media_type != media_type {
                return false;
            }
        }
        if !self.tags.is_empty() && !meta.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        true
    }
}

/// Translate a logical scope plus the requesting identity into a concrete
/// filter predicate. Pure apart from the membership snapshot reads.
///
/// # Errors
///
/// * `AuthRequired` for any non-public scope without an identity.
/// * `InvalidScope` when `collection` scope lacks a collection id.
/// * `Forbidden` when the collection is not visible to the requester.
pub async fn resolve_scope(
    store: &dyn MetadataStore,
    scope: Scope,
    collection_id: Option<&str>,
    requester: Option<i32>,
) -> Result<ScopeFilter, SearchError> {
    match scope {
        Scope::Public => Ok(ScopeFilter::Public),
        Scope::Library => {
            let requester = requester.ok_or(SearchError::AuthRequired)?;
            Ok(ScopeFilter::Owner(requester))
        }
        Scope::Favorites => {
            let requester = requester.ok_or(SearchError::AuthRequired)?;
            let ids = store.favorites(requester).await?.into_iter().collect();
            Ok(ScopeFilter::OwnedSet {
                owner_id: requester,
                ids,
            })
        }
        Scope::Collection => {
            let collection_id = collection_id.ok_or_else(|| {
                SearchError::InvalidScope("collection scope requires collection_id".into())
            })?;
            let collection = store
                .collection(collection_id)
                .await?
                .ok_or_else(|| SearchError::Forbidden(format!("collection {collection_id}")))?;
            if !collection.visible_to(requester) {
                return Err(SearchError::Forbidden(format!(
                    "collection {collection_id}"
                )));
            }
            Ok(ScopeFilter::Members {
                ids: collection.member_ids.into_iter().collect(),
            })
        }
    }
}
