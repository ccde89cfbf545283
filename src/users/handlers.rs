use axum::{extract::State, routing::get, Json, Router};
use tracing::{error, instrument, warn};

use super::dto::UserDetails;
use crate::{
    auth::extractors::SessionUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_user))
}

/// Account details of the signed-in caller. Read-only: a missing row is
/// reported as not found, never created here.
#[instrument(skip(state, session), fields(email = %session.email))]
pub async fn get_user(
    State(state): State<AppState>,
    session: SessionUser,
) -> ApiResult<Json<UserDetails>> {
    let user = state
        .users
        .find_by_email(&session.email)
        .await
        .map_err(|e| {
            error!(error = ?e, "error fetching user details");
            ApiError::Internal("Error fetching user details")
        })?
        .ok_or_else(|| {
            warn!("session has no account row");
            ApiError::NotFound("User not found")
        })?;

    Ok(Json(UserDetails::from(user)))
}
