use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod khalti;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    handlers::donation_routes()
}
