use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod lastfm;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::album_routes())
        .merge(handlers::artist_routes())
}
