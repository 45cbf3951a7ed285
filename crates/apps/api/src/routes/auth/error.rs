use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use color_eyre::eyre;
use serde_json::json;
use tracing::warn;

pub enum AuthError {
    MissingToken,
    InvalidToken,
    Internal(eyre::Report),
}

fn log_auth_failure(error: &AuthError) {
    match error {
        AuthError::MissingToken => warn!("Authentication failed: Missing Authorization token."),
        AuthError::InvalidToken => warn!("Authentication failed: Invalid token provided."),
        AuthError::Internal(e) => {
            tracing::error!("Internal server error during authentication: {:?}", e);
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        log_auth_failure(&self);

        let (status, error_message) = match self {
            AuthError::MissingToken | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            AuthError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
