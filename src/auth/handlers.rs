use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::extractors::SessionUser;
use super::session::{is_valid_email, verify_identity, SessionKeys};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::provision::{provision_user, Identity},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/providers", get(list_providers))
        .route("/auth/callback/:provider", post(sign_in_callback))
        .route("/auth/session", get(current_session))
        .route("/auth/signout", post(sign_out))
}

/// Request body for the sign-in callback.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: String,
}

#[instrument(skip(state))]
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let providers = state
        .config
        .providers
        .iter()
        .map(|p| ProviderInfo { name: p.name.clone() })
        .collect();
    Json(providers)
}

/// Completes sign-in for a provider-verified identity.
///
/// The account row is provisioned before the session cookie is issued; if
/// provisioning fails no session is handed out.
#[instrument(skip(state, jar, payload))]
pub async fn sign_in_callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    jar: CookieJar,
    Json(payload): Json<CallbackRequest>,
) -> ApiResult<(CookieJar, Json<SignedIn>)> {
    let provider = state
        .config
        .provider(&provider_name)
        .ok_or(ApiError::NotFound("Unknown provider"))?;

    let claims = verify_identity(provider, &payload.id_token).map_err(|e| {
        warn!(error = %e, provider = %provider_name, "identity assertion rejected");
        ApiError::Unauthorized
    })?;

    let email = claims
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| {
            warn!(provider = %provider_name, "identity assertion without usable email");
            ApiError::Unauthorized
        })?
        .to_string();

    let identity = Identity {
        email,
        name: claims.name.clone(),
    };

    let outcome = provision_user(state.users.as_ref(), &identity)
        .await
        .map_err(|e| {
            error!(error = ?e, email = %identity.email, "provisioning failed; sign-in denied");
            ApiError::Internal("Sign-in failed")
        })?;

    let name = identity.name.unwrap_or_default();
    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&identity.email, &name).map_err(|e| {
        error!(error = %e, "session sign failed");
        ApiError::Internal("Sign-in failed")
    })?;

    info!(email = %identity.email, provider = %provider_name, ?outcome, "user signed in");
    Ok((
        jar.add(keys.session_cookie(token)),
        Json(SignedIn {
            email: identity.email,
            name,
        }),
    ))
}

/// Identity carried by the caller's session.
#[instrument(skip(session))]
pub async fn current_session(session: SessionUser) -> Json<SignedIn> {
    Json(SignedIn {
        email: session.email,
        name: session.name,
    })
}

#[instrument(skip(state, jar))]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let keys = SessionKeys::from_ref(&state);
    (StatusCode::NO_CONTENT, jar.remove(keys.removal_cookie()))
}
