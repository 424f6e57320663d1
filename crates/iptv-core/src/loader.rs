//! Playlist loading from URLs and local files

use crate::{
    config::LoaderConfig,
    parser,
    types::{Playlist, PlaylistId},
    Error, Result,
};
use chrono::Utc;
use reqwest::Client;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

const DEFAULT_PLAYLIST_NAME: &str = "Playlist";

/// Fetches playlist text and turns it into a [`Playlist`]
pub struct PlaylistLoader {
    client: Client,
}

impl PlaylistLoader {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and parse a remote playlist
    #[instrument(skip(self))]
    pub async fn load_from_url(&self, url: &str) -> Result<Playlist> {
        info!(url = %url, "Loading playlist from URL");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::PlaylistFetch(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Playlist response");
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::PlaylistFetch(e.to_string()))?;
        let content = String::from_utf8_lossy(&body);
        debug!(bytes = body.len(), "Playlist content received");

        load_from_str(name_from_url(url), &content, Some(url.to_string()))
    }

    /// Read and parse a local playlist file
    #[instrument(skip_all)]
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Playlist> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading playlist from file");

        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        load_from_str(strip_playlist_extension(&file_name), &content, None)
    }
}

/// Validate, parse and wrap already-decoded content
pub fn load_from_str(
    name: impl Into<String>,
    content: &str,
    source_url: Option<String>,
) -> Result<Playlist> {
    if !parser::is_valid_m3u(content) {
        return Err(Error::InvalidFormat);
    }

    let parsed = parser::parse_playlist(content);
    if parsed.channels.is_empty() {
        return Err(Error::NoChannels);
    }

    let playlist = Playlist {
        id: PlaylistId::generate(),
        name: name.into(),
        source_url,
        channels: parsed.channels,
        epg_url: parsed.epg_url,
        date_added: Utc::now(),
    };

    info!(
        id = %playlist.id,
        name = %playlist.name,
        channels = playlist.channels.len(),
        "Playlist created"
    );

    Ok(playlist)
}

/// Playlist name from the final URL path segment
pub fn name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return DEFAULT_PLAYLIST_NAME.to_string();
    };

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let name = strip_playlist_extension(segment);
    if name.is_empty() {
        DEFAULT_PLAYLIST_NAME.to_string()
    } else {
        name
    }
}

/// Drop a trailing `.m3u` / `.m3u8`, case-insensitively
pub fn strip_playlist_extension(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    for ext in [".m3u8", ".m3u"] {
        if lower.ends_with(ext) {
            return file_name[..file_name.len() - ext.len()].to_string();
        }
    }
    file_name.to_string()
}
