use serde::{Deserialize, Serialize};

use crate::catalog::lastfm::{AlbumInfo, TopAlbum};
use crate::catalog::repo_types::{Album, Artist};

#[derive(Debug, Serialize)]
pub struct TopAlbumsResponse {
    pub albums: Vec<TopAlbum>,
}

#[derive(Debug, Serialize)]
pub struct AlbumDetailsResponse {
    pub album: AlbumInfo,
}

#[derive(Debug, Deserialize)]
pub struct AddAlbumRequest {
    pub mbid: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub release_year: i32,
    pub cover_art: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlbumAddedResponse {
    pub message: String,
    pub album: Album,
}

#[derive(Debug, Deserialize)]
pub struct AddArtistRequest {
    pub artist_name: String,
}

#[derive(Debug, Serialize)]
pub struct ArtistAddedResponse {
    pub message: String,
    pub artist: Artist,
}
