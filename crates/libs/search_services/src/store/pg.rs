use crate::store::{MetadataStore, StoreError};
use async_trait::async_trait;
use common_types::{CollectionMeta, MediaMeta, MediaType, Visibility};
use sqlx::{FromRow, PgPool};

/// Postgres-backed metadata store over the ingestion schema.
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MediaMetaRow {
    id: String,
    owner_id: Option<i32>,
    visibility: String,
    media_type: String,
    title: Option<String>,
    tags: Vec<String>,
    media_url: String,
    thumbnail_url: Option<String>,
}

impl From<MediaMetaRow> for MediaMeta {
    fn from(row: MediaMetaRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            visibility: if row.visibility == "private" {
                Visibility::Private
            } else {
                Visibility::Public
            },
            media_type: if row.media_type == "video" {
                MediaType::Video
            } else {
                MediaType::Image
            },
            title: row.title,
            tags: row.tags,
            media_url: row.media_url,
            thumbnail_url: row.thumbnail_url,
        }
    }
}

#[derive(FromRow)]
struct CollectionRow {
    id: String,
    owner_id: i32,
    is_public: bool,
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Query(other),
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<MediaMeta>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, MediaMetaRow>(
            r"
            SELECT id, owner_id, visibility, media_type, title, tags,
                   media_url, thumbnail_url
            FROM media_item
            WHERE id = ANY($1) AND deleted = false
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MediaMeta::from).collect())
    }

    async fn collection(&self, collection_id: &str) -> Result<Option<CollectionMeta>, StoreError> {
        let Some(row) = sqlx::query_as::<_, CollectionRow>(
            r"
            SELECT id, owner_id, is_public
            FROM collection
            WHERE id = $1
            ",
        )
        .bind(collection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let member_ids = sqlx::query_scalar::<_, String>(
            r"
            SELECT media_item_id
            FROM collection_item
            WHERE collection_id = $1
            ",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(CollectionMeta {
            id: row.id,
            owner_id: row.owner_id,
            is_public: row.is_public,
            member_ids,
        }))
    }

    async fn favorites(&self, user_id: i32) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT media_item_id
            FROM favorite
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
