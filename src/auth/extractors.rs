use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::session::SessionKeys;
use crate::error::ApiError;

/// Caller identity resolved from the session cookie or a bearer token.
///
/// Rejects with `Unauthorized` before the handler runs, so handlers that take
/// a `SessionUser` never touch the store for anonymous requests.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);

        let token = bearer_token(&parts.headers)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(&keys.cookie_name)
                    .map(|c| c.value().to_string())
            })
            .ok_or(ApiError::Unauthorized)?;

        let claims = keys.verify(&token).map_err(|e| {
            debug!(error = %e, "session rejected");
            ApiError::Unauthorized
        })?;

        Ok(SessionUser {
            email: claims.sub,
            name: claims.name,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
