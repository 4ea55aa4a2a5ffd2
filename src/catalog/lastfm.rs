use anyhow::Context;
use axum::async_trait;
use serde::Deserialize;

use crate::config::LastfmConfig;

/// Album row from an artist's top-albums listing, already reshaped.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TopAlbum {
    pub name: String,
    pub mbid: Option<String>,
    pub playcount: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AlbumInfo {
    pub title: String,
    pub artist: String,
    pub mbid: Option<String>,
    pub cover_art: Option<String>,
    pub listeners: Option<i64>,
    pub playcount: Option<i64>,
    pub tracks: Vec<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtistInfo {
    pub name: String,
    pub mbid: Option<String>,
    pub image: Option<String>,
    pub listeners: i64,
    pub playcount: i64,
    pub bio: Option<String>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn top_albums(&self, artist: &str) -> anyhow::Result<Vec<TopAlbum>>;
    /// None when the catalog does not know the album.
    async fn album_info(&self, artist: &str, album: &str) -> anyhow::Result<Option<AlbumInfo>>;
    /// None when the catalog does not know the artist.
    async fn artist_info(&self, name: &str) -> anyhow::Result<Option<ArtistInfo>>;
}

pub struct LastfmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LastfmClient {
    pub fn new(config: &LastfmConfig) -> anyhow::Result<Self> {
        // Request-level timeout as the resilience floor for catalog calls.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build lastfm http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> anyhow::Result<String> {
        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", &self.api_key),
            ("format", "json"),
        ];
        query.extend_from_slice(params);

        let body = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&query)
            .send()
            .await
            .with_context(|| format!("lastfm {method} request"))?
            .text()
            .await
            .with_context(|| format!("lastfm {method} body"))?;
        Ok(body)
    }
}

#[async_trait]
impl CatalogClient for LastfmClient {
    async fn top_albums(&self, artist: &str) -> anyhow::Result<Vec<TopAlbum>> {
        let body = self
            .call("artist.gettopalbums", &[("artist", artist)])
            .await?;
        parse_top_albums(&body)
    }

    async fn album_info(&self, artist: &str, album: &str) -> anyhow::Result<Option<AlbumInfo>> {
        let body = self
            .call("album.getinfo", &[("artist", artist), ("album", album)])
            .await?;
        parse_album_info(&body)
    }

    async fn artist_info(&self, name: &str) -> anyhow::Result<Option<ArtistInfo>> {
        let body = self.call("artist.getinfo", &[("artist", name)]).await?;
        parse_artist_info(&body)
    }
}

// --- wire shapes ---

/// Last.fm serializes counters as numbers in some methods and strings in
/// others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(i64),
    Str(String),
}

impl NumOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumOrString::Num(n) => Some(*n),
            NumOrString::Str(s) => s.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

fn pick_image(images: &[WireImage]) -> Option<String> {
    images
        .iter()
        .find(|i| i.size == "large" && !i.url.is_empty())
        .or_else(|| images.iter().rev().find(|i| !i.url.is_empty()))
        .map(|i| i.url.clone())
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
struct TopAlbumsResponse {
    topalbums: Option<TopAlbumsBlock>,
    error: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsBlock {
    #[serde(default)]
    album: Vec<WireTopAlbum>,
}

#[derive(Debug, Deserialize)]
struct WireTopAlbum {
    name: String,
    mbid: Option<String>,
    playcount: Option<NumOrString>,
    #[serde(default)]
    image: Vec<WireImage>,
}

pub(crate) fn parse_top_albums(body: &str) -> anyhow::Result<Vec<TopAlbum>> {
    let response: TopAlbumsResponse =
        serde_json::from_str(body).context("parse lastfm topalbums")?;
    if let Some(code) = response.error {
        anyhow::bail!(
            "lastfm error {}: {}",
            code,
            response.message.unwrap_or_default()
        );
    }
    let block = response.topalbums.context("topalbums missing")?;
    Ok(block
        .album
        .into_iter()
        .map(|a| TopAlbum {
            image: pick_image(&a.image),
            mbid: none_if_empty(a.mbid),
            playcount: a.playcount.and_then(|p| p.as_i64()),
            name: a.name,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct AlbumInfoResponse {
    album: Option<WireAlbum>,
    error: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    name: String,
    artist: String,
    mbid: Option<String>,
    listeners: Option<NumOrString>,
    playcount: Option<NumOrString>,
    #[serde(default)]
    image: Vec<WireImage>,
    tracks: Option<WireTracks>,
    wiki: Option<WireWiki>,
}

#[derive(Debug, Deserialize)]
struct WireTracks {
    #[serde(default)]
    track: Vec<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireWiki {
    summary: Option<String>,
}

pub(crate) fn parse_album_info(body: &str) -> anyhow::Result<Option<AlbumInfo>> {
    let response: AlbumInfoResponse =
        serde_json::from_str(body).context("parse lastfm album.getinfo")?;
    if response.error.is_some() {
        return Ok(None);
    }
    let Some(album) = response.album else {
        return Ok(None);
    };
    Ok(Some(AlbumInfo {
        cover_art: pick_image(&album.image),
        mbid: none_if_empty(album.mbid),
        listeners: album.listeners.and_then(|v| v.as_i64()),
        playcount: album.playcount.and_then(|v| v.as_i64()),
        tracks: album
            .tracks
            .map(|t| t.track.into_iter().map(|t| t.name).collect())
            .unwrap_or_default(),
        summary: album.wiki.and_then(|w| none_if_empty(w.summary)),
        title: album.name,
        artist: album.artist,
    }))
}

#[derive(Debug, Deserialize)]
struct ArtistInfoResponse {
    artist: Option<WireArtist>,
    error: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    name: String,
    mbid: Option<String>,
    #[serde(default)]
    image: Vec<WireImage>,
    stats: Option<WireStats>,
    bio: Option<WireWiki>,
}

#[derive(Debug, Deserialize)]
struct WireStats {
    listeners: Option<NumOrString>,
    playcount: Option<NumOrString>,
}

pub(crate) fn parse_artist_info(body: &str) -> anyhow::Result<Option<ArtistInfo>> {
    let response: ArtistInfoResponse =
        serde_json::from_str(body).context("parse lastfm artist.getinfo")?;
    if response.error.is_some() {
        return Ok(None);
    }
    let Some(artist) = response.artist else {
        return Ok(None);
    };
    let stats = artist.stats.as_ref();
    Ok(Some(ArtistInfo {
        image: pick_image(&artist.image),
        mbid: none_if_empty(artist.mbid),
        listeners: stats
            .and_then(|s| s.listeners.as_ref())
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        playcount: stats
            .and_then(|s| s.playcount.as_ref())
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        bio: artist.bio.and_then(|b| none_if_empty(b.summary)),
        name: artist.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_albums_and_picks_the_large_image() {
        let body = r##"{
          "topalbums": {
            "album": [
              {
                "name": "OK Computer",
                "playcount": 1234567,
                "mbid": "0b6b4ba0",
                "image": [
                  {"#text": "http://img/s.png", "size": "small"},
                  {"#text": "http://img/m.png", "size": "medium"},
                  {"#text": "http://img/l.png", "size": "large"}
                ]
              },
              {"name": "Kid A", "playcount": "99", "mbid": "", "image": []}
            ]
          }
        }"##;
        let albums = parse_top_albums(body).unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].name, "OK Computer");
        assert_eq!(albums[0].playcount, Some(1_234_567));
        assert_eq!(albums[0].image.as_deref(), Some("http://img/l.png"));
        assert_eq!(albums[1].playcount, Some(99));
        assert_eq!(albums[1].mbid, None);
        assert_eq!(albums[1].image, None);
    }

    #[test]
    fn top_albums_error_envelope_is_an_error() {
        let body = r#"{"error": 6, "message": "The artist you supplied could not be found"}"#;
        let err = parse_top_albums(body).unwrap_err();
        assert!(err.to_string().contains("lastfm error 6"));
    }

    #[test]
    fn parses_album_info_with_tracks_and_wiki() {
        let body = r##"{
          "album": {
            "name": "In Rainbows",
            "artist": "Radiohead",
            "mbid": "6e335887",
            "listeners": "901234",
            "playcount": "5678901",
            "image": [{"#text": "http://img/l.png", "size": "large"}],
            "tracks": {"track": [{"name": "15 Step"}, {"name": "Bodysnatchers"}]},
            "wiki": {"summary": "Released in 2007."}
          }
        }"##;
        let info = parse_album_info(body).unwrap().unwrap();
        assert_eq!(info.title, "In Rainbows");
        assert_eq!(info.artist, "Radiohead");
        assert_eq!(info.listeners, Some(901_234));
        assert_eq!(info.tracks, vec!["15 Step", "Bodysnatchers"]);
        assert_eq!(info.summary.as_deref(), Some("Released in 2007."));
    }

    #[test]
    fn unknown_album_maps_to_none() {
        let body = r#"{"error": 6, "message": "Album not found"}"#;
        assert!(parse_album_info(body).unwrap().is_none());
    }

    #[test]
    fn parses_artist_info_stats() {
        let body = r##"{
          "artist": {
            "name": "Radiohead",
            "mbid": "a74b1b7f",
            "image": [
              {"#text": "http://img/s.png", "size": "small"},
              {"#text": "http://img/l.png", "size": "large"}
            ],
            "stats": {"listeners": "4821030", "playcount": "243911456"},
            "bio": {"summary": "English rock band."}
          }
        }"##;
        let info = parse_artist_info(body).unwrap().unwrap();
        assert_eq!(info.name, "Radiohead");
        assert_eq!(info.listeners, 4_821_030);
        assert_eq!(info.playcount, 243_911_456);
        assert_eq!(info.image.as_deref(), Some("http://img/l.png"));
        assert_eq!(info.bio.as_deref(), Some("English rock band."));
    }

    #[test]
    fn unknown_artist_maps_to_none() {
        let body = r#"{"error": 6, "message": "The artist you supplied could not be found"}"#;
        assert!(parse_artist_info(body).unwrap().is_none());
    }
}
