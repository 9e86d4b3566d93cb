mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub(crate) mod repo_types;
pub mod seed;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
