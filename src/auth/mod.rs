use crate::state::AppState;
use axum::Router;

mod claims;
pub(crate) mod extractors;
pub mod handlers;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
