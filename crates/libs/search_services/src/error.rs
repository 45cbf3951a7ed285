use crate::embedding::EmbedError;
use crate::index::IndexError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use color_eyre::eyre;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Error taxonomy of the search surface.
///
/// Transient variants (`IndexUnavailable`, `EmbeddingUnavailable`) are
/// retried internally a bounded number of times before they reach the
/// caller; everything else surfaces immediately.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("authentication required")]
    AuthRequired,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown or expired query session: {0}")]
    SessionExpired(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("embedding provider rejected the input: {0}")]
    EmbeddingRejected(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] eyre::Report),
}

impl SearchError {
    /// Whether retrying the same call may succeed without client changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::IndexUnavailable(_) | Self::EmbeddingUnavailable(_)
        )
    }
}

fn log_error(error: &SearchError) {
    match error {
        SearchError::AuthRequired => warn!("Search -> authentication required"),
        SearchError::Forbidden(msg) => warn!("Search -> forbidden: {}", msg),
        SearchError::InvalidScope(msg) => warn!("Search -> invalid scope: {}", msg),
        SearchError::BadRequest(msg) => warn!("Search -> bad request: {}", msg),
        SearchError::NotFound(msg) => warn!("Search -> not found: {}", msg),
        SearchError::SessionExpired(id) => warn!("Search -> session expired: {}", id),
        SearchError::IndexUnavailable(msg) => error!("Vector index unavailable: {}", msg),
        SearchError::EmbeddingUnavailable(msg) => error!("Embedding provider unavailable: {}", msg),
        SearchError::EmbeddingRejected(msg) => warn!("Embedding input rejected: {}", msg),
        SearchError::Database(e) => error!("Database query failed: {}", e),
        SearchError::Internal(e) => error!("Internal error: {:?}", e),
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        log_error(&self);

        let (status, error_message) = match self {
            Self::AuthRequired => (
                StatusCode::UNAUTHORIZED,
                "Authentication required for this scope.".to_string(),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, format!("Forbidden: {msg}")),
            Self::InvalidScope(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid scope: {msg}"),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Bad request: {msg}")),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {msg}")),
            Self::SessionExpired(id) => (
                StatusCode::NOT_FOUND,
                format!("Unknown or expired query session: {id}. Resubmit the query."),
            ),
            Self::IndexUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Search index temporarily unavailable, retry shortly.".to_string(),
            ),
            Self::EmbeddingUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Embedding service temporarily unavailable, retry shortly.".to_string(),
            ),
            Self::EmbeddingRejected(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported query content: {msg}"),
            ),
            Self::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "A database error occurred.".to_string(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected internal error occurred.".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable(msg) => Self::IndexUnavailable(msg),
            IndexError::Query(sql_err) => Self::Database(sql_err),
        }
    }
}

impl From<EmbedError> for SearchError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Unavailable(msg) => Self::EmbeddingUnavailable(msg),
            EmbedError::Rejected(msg) => Self::EmbeddingRejected(msg),
        }
    }
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::IndexUnavailable(msg),
            StoreError::Query(sql_err) => Self::Database(sql_err),
        }
    }
}

impl From<tokio::task::JoinError> for SearchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(eyre::Report::new(err))
    }
}
