use crate::api_state::ApiContext;
use crate::routes::search::handlers::{
    get_results_page_handler, invalidate_results_handler, search_image_handler,
    search_similar_handler, search_text_handler,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upper bound on uploaded image bodies.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn search_router() -> Router<ApiContext> {
    Router::new()
        .route("/search/text", post(search_text_handler))
        .route("/search/image", post(search_image_handler))
        .route("/search/similar/{media_id}", get(search_similar_handler))
        .route(
            "/search/results/{query_id}",
            get(get_results_page_handler).delete(invalidate_results_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
