use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::lastfm::ArtistInfo;
use crate::catalog::repo_types::{Album, Artist};

const ALBUM_COLUMNS: &str = "id, mbid, title, artist, genre, release_year, cover_art, \
                             description, average_rating, created_by, created_at";

impl Album {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Album>> {
        let album = sqlx::query_as::<_, Album>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(album)
    }

    pub async fn find_by_mbid(db: &PgPool, mbid: &str) -> anyhow::Result<Option<Album>> {
        let album = sqlx::query_as::<_, Album>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE mbid = $1"
        ))
        .bind(mbid)
        .fetch_optional(db)
        .await?;
        Ok(album)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        mbid: &str,
        title: &str,
        artist: &str,
        genre: &str,
        release_year: i32,
        cover_art: Option<&str>,
        description: Option<&str>,
        created_by: Uuid,
    ) -> anyhow::Result<Album> {
        let album = sqlx::query_as::<_, Album>(&format!(
            r#"
            INSERT INTO albums (mbid, title, artist, genre, release_year, cover_art, description, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ALBUM_COLUMNS}
            "#
        ))
        .bind(mbid)
        .bind(title)
        .bind(artist)
        .bind(genre)
        .bind(release_year)
        .bind(cover_art)
        .bind(description)
        .bind(created_by)
        .fetch_one(db)
        .await?;
        Ok(album)
    }
}

impl Artist {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Artist>> {
        let artists = sqlx::query_as::<_, Artist>(
            r#"
            SELECT id, name, mbid, image_url, listeners, playcount, bio, created_at
            FROM artists
            ORDER BY name ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(artists)
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Artist>> {
        let artist = sqlx::query_as::<_, Artist>(
            r#"
            SELECT id, name, mbid, image_url, listeners, playcount, bio, created_at
            FROM artists
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(artist)
    }

    /// Persist an artist as the catalog reported it.
    pub async fn create_from_info(db: &PgPool, info: &ArtistInfo) -> anyhow::Result<Artist> {
        let artist = sqlx::query_as::<_, Artist>(
            r#"
            INSERT INTO artists (name, mbid, image_url, listeners, playcount, bio)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, mbid, image_url, listeners, playcount, bio, created_at
            "#,
        )
        .bind(&info.name)
        .bind(&info.mbid)
        .bind(&info.image)
        .bind(info.listeners)
        .bind(info.playcount)
        .bind(&info.bio)
        .fetch_one(db)
        .await?;
        Ok(artist)
    }
}
