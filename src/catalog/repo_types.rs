use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Cached catalog entry for an album, reviewable once it exists here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: Uuid,
    pub mbid: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub release_year: i32,
    pub cover_art: Option<String>,
    pub description: Option<String>,
    pub average_rating: f64,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub mbid: Option<String>,
    pub image_url: Option<String>,
    pub listeners: i64,
    pub playcount: i64,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
}
