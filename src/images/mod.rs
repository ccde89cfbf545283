use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod probe;
pub mod transform;

pub fn router() -> Router<AppState> {
    handlers::image_routes()
}
