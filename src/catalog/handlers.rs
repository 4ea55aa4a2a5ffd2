use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    catalog::{
        dto::{
            AddAlbumRequest, AddArtistRequest, AlbumAddedResponse, AlbumDetailsResponse,
            ArtistAddedResponse, TopAlbumsResponse,
        },
        repo_types::{Album, Artist},
    },
    error::ApiError,
    state::AppState,
};

pub fn album_routes() -> Router<AppState> {
    Router::new()
        .route("/albums/fetch/:artist", get(fetch_top_albums))
        .route("/albums/details/:artist/:album", get(album_details))
        .route("/albums/add", post(add_album))
}

pub fn artist_routes() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list_artists))
        .route("/artists/add", post(add_artist))
        .route("/artists/:name", get(get_artist))
}

#[instrument(skip(state))]
pub async fn fetch_top_albums(
    State(state): State<AppState>,
    Path(artist): Path<String>,
) -> Result<Json<TopAlbumsResponse>, ApiError> {
    let albums = state.catalog.top_albums(&artist).await.map_err(|e| {
        warn!(error = %e, %artist, "top albums lookup failed");
        ApiError::dependency("Failed to fetch albums")
    })?;
    Ok(Json(TopAlbumsResponse { albums }))
}

#[instrument(skip(state))]
pub async fn album_details(
    State(state): State<AppState>,
    Path((artist, album)): Path<(String, String)>,
) -> Result<Json<AlbumDetailsResponse>, ApiError> {
    let info = state
        .catalog
        .album_info(&artist, &album)
        .await
        .map_err(|e| {
            warn!(error = %e, %artist, %album, "album details lookup failed");
            ApiError::dependency("Failed to fetch album details")
        })?
        .ok_or_else(|| ApiError::not_found("Album not found"))?;
    Ok(Json(AlbumDetailsResponse { album: info }))
}

#[instrument(skip(state, payload))]
pub async fn add_album(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AddAlbumRequest>,
) -> Result<(StatusCode, Json<AlbumAddedResponse>), ApiError> {
    if payload.mbid.trim().is_empty() || payload.title.trim().is_empty() {
        return Err(ApiError::validation("mbid and title are required"));
    }

    if Album::find_by_mbid(&state.db, &payload.mbid)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::conflict("Album already exists"));
    }

    let album = Album::create(
        &state.db,
        &payload.mbid,
        &payload.title,
        &payload.artist,
        &payload.genre,
        payload.release_year,
        payload.cover_art.as_deref(),
        payload.description.as_deref(),
        auth.id,
    )
    .await
    .map_err(ApiError::Internal)?;

    info!(album_id = %album.id, "album added");
    Ok((
        StatusCode::CREATED,
        Json(AlbumAddedResponse {
            message: "Album added successfully".into(),
            album,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_artists(
    State(state): State<AppState>,
) -> Result<Json<Vec<Artist>>, ApiError> {
    let artists = Artist::list(&state.db).await.map_err(ApiError::Internal)?;
    Ok(Json(artists))
}

#[instrument(skip(state))]
pub async fn get_artist(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Artist>, ApiError> {
    let artist = Artist::find_by_name(&state.db, &name)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("Artist not found"))?;
    Ok(Json(artist))
}

/// Pulls the artist from the external catalog and caches it locally.
#[instrument(skip(state, payload))]
pub async fn add_artist(
    State(state): State<AppState>,
    Json(payload): Json<AddArtistRequest>,
) -> Result<(StatusCode, Json<ArtistAddedResponse>), ApiError> {
    let name = payload.artist_name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Artist name is required"));
    }

    let info = state
        .catalog
        .artist_info(name)
        .await
        .map_err(|e| {
            warn!(error = %e, artist = %name, "artist lookup failed");
            ApiError::dependency("Failed to fetch artist data")
        })?
        .ok_or_else(|| ApiError::not_found("Artist not found on the catalog"))?;

    if Artist::find_by_name(&state.db, &info.name)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::conflict("Artist already exists"));
    }

    let artist = Artist::create_from_info(&state.db, &info)
        .await
        .map_err(ApiError::Internal)?;

    info!(artist_id = %artist.id, artist = %artist.name, "artist added");
    Ok((
        StatusCode::CREATED,
        Json(ArtistAddedResponse {
            message: "Artist added successfully".into(),
            artist,
        }),
    ))
}
