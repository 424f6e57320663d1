//! Core types for the IPTV player

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name used when neither the playlist entry nor the URL yields one
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// A single streamable channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    /// Display name
    pub name: String,
    /// Stream URL
    pub url: String,
    /// Logo image URL (`tvg-logo`)
    pub logo: Option<String>,
    /// Group title (`group-title`)
    pub group: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            logo: None,
            group: None,
        }
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// How this channel's stream has to be played
    pub fn stream_kind(&self) -> StreamKind {
        StreamKind::detect(&self.url)
    }
}

/// Stream classification by URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Manifest with quality renditions, played through a stream engine
    Adaptive,
    /// Fixed URL assigned straight to the output sink
    Direct,
}

impl StreamKind {
    /// Classify a stream URL. Any `.m3u8` occurrence (path or query) marks an
    /// adaptive manifest, matching how IPTV panels hand out HLS links.
    pub fn detect(url: &str) -> Self {
        if url.to_ascii_lowercase().contains(".m3u8") {
            StreamKind::Adaptive
        } else {
            StreamKind::Direct
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Adaptive => write!(f, "adaptive"),
            StreamKind::Direct => write!(f, "direct"),
        }
    }
}

/// Unique identifier for a loaded playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    /// Time-based id with a random suffix: `playlist_<millis>_<suffix>`
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self(format!(
            "playlist_{}_{}",
            Utc::now().timestamp_millis(),
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlaylistId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named, non-empty, ordered channel list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    /// Where the playlist was fetched from (None for local files)
    pub source_url: Option<String>,
    pub channels: Vec<Channel>,
    /// EPG guide URL announced in the playlist header
    #[serde(default)]
    pub epg_url: Option<String>,
    pub date_added: DateTime<Utc>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Quality rendition reported by the stream engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Position in the engine's level list
    pub index: usize,
    /// Video height in pixels
    pub height: u32,
    /// Bitrate in bits per second
    pub bitrate: u64,
}

impl QualityLevel {
    /// Label such as `720p (2500kbps)`
    pub fn name(&self) -> String {
        format!("{}p ({}kbps)", self.height, (self.bitrate as f64 / 1000.0).round() as u64)
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Quality choice; `Auto` corresponds to the engine's `-1` level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    /// Engine-level integer form (`-1` = automatic)
    pub fn as_engine_level(&self) -> i64 {
        match self {
            QualitySelection::Auto => -1,
            QualitySelection::Level(level) => *level as i64,
        }
    }

    pub fn from_engine_level(level: i64) -> Self {
        if level < 0 {
            QualitySelection::Auto
        } else {
            QualitySelection::Level(level as usize)
        }
    }
}

impl std::fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualitySelection::Auto => write!(f, "AUTO"),
            QualitySelection::Level(level) => write!(f, "{}", level),
        }
    }
}

/// Observable playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing playing
    Idle,
    /// Channel requested, no data flowing yet
    Loading,
    /// Data flowing / frames playing
    Playing,
    /// Paused by the user
    Paused,
    /// Unrecoverable stream failure, waiting to advance
    Error,
}

impl PlaybackState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, target),
            // Any state can start a new channel or stop
            (_, Loading) | (_, Idle) |
            // Data arrives, or the sink resumes after a stall
            (Loading, Playing) | (Paused, Playing) | (Playing, Playing) |
            // User pause
            (Loading, Paused) | (Playing, Paused) |
            // Unrecoverable stream failure
            (Loading, Error) | (Playing, Error) | (Paused, Error)
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}
