use crate::api_state::ApiContext;
use crate::routes::auth::middlewares::optional_user::OptionalUser;
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use search_services::error::SearchError;
use search_services::interfaces::{
    ImageSearchParams, PageParams, SearchResults, SimilarParams, TextSearchParams,
};
use tracing::instrument;

/// Open a query session for a free-text query and return its first page.
///
/// Subsequent pages of the same logical query go through
/// `GET /search/results/{query_id}` using the returned `queryId`.
#[utoipa::path(
    post,
    path = "/search/text",
    tag = "Search",
    params(TextSearchParams),
    responses(
        (status = 200, description = "First page of ranked results", body = SearchResults),
        (status = 400, description = "Empty query or invalid paging."),
        (status = 401, description = "A non-public scope was requested anonymously."),
        (status = 503, description = "The embedding provider or vector index is unavailable."),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(context), err(Debug))]
pub async fn search_text_handler(
    State(context): State<ApiContext>,
    OptionalUser(user_id): OptionalUser,
    Query(params): Query<TextSearchParams>,
) -> Result<Json<SearchResults>, SearchError> {
    let results = context.search.search_text(user_id, params).await?;
    Ok(Json(results))
}

/// Open a query session for an uploaded image (multipart field `file`).
#[utoipa::path(
    post,
    path = "/search/image",
    tag = "Search",
    params(ImageSearchParams),
    responses(
        (status = 200, description = "First page of ranked results", body = SearchResults),
        (status = 400, description = "Missing or empty file, or unsupported content."),
        (status = 401, description = "A non-public scope was requested anonymously."),
        (status = 503, description = "The embedding provider or vector index is unavailable."),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(context, multipart), err(Debug))]
pub async fn search_image_handler(
    State(context): State<ApiContext>,
    OptionalUser(user_id): OptionalUser,
    Query(params): Query<ImageSearchParams>,
    mut multipart: Multipart,
) -> Result<Json<SearchResults>, SearchError> {
    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SearchError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| SearchError::BadRequest(format!("failed to read upload: {e}")))?;
            file_bytes = Some(bytes);
            break;
        }
    }
    let bytes =
        file_bytes.ok_or_else(|| SearchError::BadRequest("missing 'file' field".to_string()))?;

    let results = context.search.search_image(user_id, &bytes, params).await?;
    Ok(Json(results))
}

/// Find items visually similar to an already-indexed item. The source
/// item itself is excluded from the results.
#[utoipa::path(
    get,
    path = "/search/similar/{media_id}",
    tag = "Search",
    params(
        ("media_id" = String, Path, description = "Id of the source media item"),
        SimilarParams
    ),
    responses(
        (status = 200, description = "First page of ranked results", body = SearchResults),
        (status = 404, description = "The source item is not indexed."),
        (status = 503, description = "The vector index is unavailable."),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(context), err(Debug))]
pub async fn search_similar_handler(
    State(context): State<ApiContext>,
    OptionalUser(user_id): OptionalUser,
    Path(media_id): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SearchResults>, SearchError> {
    let results = context
        .search
        .search_similar(user_id, &media_id, params)
        .await?;
    Ok(Json(results))
}

/// Fetch a page of an open query session. Repeated calls with the same
/// page return identical results.
#[utoipa::path(
    get,
    path = "/search/results/{query_id}",
    tag = "Search",
    params(
        ("query_id" = String, Path, description = "Session id returned by a search endpoint"),
        PageParams
    ),
    responses(
        (status = 200, description = "The requested page", body = SearchResults),
        (status = 404, description = "Unknown or expired query session."),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(context), err(Debug))]
pub async fn get_results_page_handler(
    State(context): State<ApiContext>,
    OptionalUser(user_id): OptionalUser,
    Path(query_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<SearchResults>, SearchError> {
    let results = context.search.results_page(user_id, &query_id, params).await?;
    Ok(Json(results))
}

/// Tear a query session down before its TTL expires.
#[utoipa::path(
    delete,
    path = "/search/results/{query_id}",
    tag = "Search",
    params(
        ("query_id" = String, Path, description = "Session id returned by a search endpoint")
    ),
    responses(
        (status = 204, description = "The session was invalidated."),
        (status = 404, description = "Unknown or expired query session."),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(context), err(Debug))]
pub async fn invalidate_results_handler(
    State(context): State<ApiContext>,
    OptionalUser(user_id): OptionalUser,
    Path(query_id): Path<String>,
) -> Result<StatusCode, SearchError> {
    context.search.invalidate(user_id, &query_id)?;
    Ok(StatusCode::NO_CONTENT)
}
