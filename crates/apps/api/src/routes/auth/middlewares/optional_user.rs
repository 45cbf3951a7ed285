use crate::api_state::ApiContext;
use crate::routes::auth::error::AuthError;
use crate::routes::auth::middlewares::common::{decode_token, extract_context, extract_token};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;

/// Identity of the requester, if a valid bearer token was presented.
///
/// A missing Authorization header resolves to an anonymous request; a
/// present-but-invalid token is rejected outright.
#[derive(Clone, Copy, Debug)]
pub struct OptionalUser(pub Option<i32>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
    State<ApiContext>: FromRequestParts<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match extract_token(parts) {
            Ok(token) => {
                let context = extract_context(parts, state).await?;
                let claims = decode_token(&token, &context.settings.secrets.jwt)?;
                Ok(Self(Some(claims.sub)))
            }
            Err(AuthError::MissingToken) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}
