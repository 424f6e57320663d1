//! Error types for the IPTV core

use thiserror::Error;

/// Result type alias for playlist and player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    // Format errors
    #[error("Invalid M3U format")]
    InvalidFormat,

    #[error("No channels found in playlist")]
    NoChannels,

    // Transport errors
    #[error("Failed to fetch playlist: {0}")]
    PlaylistFetch(String),

    #[error("HTTP error! status: {status} ({url})")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stream manifest: {0}")]
    ManifestParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Storage errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Playback errors
    #[error("Player service is not running")]
    ServiceClosed,
}

impl Error {
    /// Returns true if the content itself was rejected
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::InvalidFormat | Error::NoChannels)
    }

    /// Returns true if the content could not be fetched at all
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::PlaylistFetch(_) | Error::HttpStatus { .. } | Error::Network(_) | Error::Io(_)
        )
    }

    /// Returns a stable error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidFormat => "INVALID_FORMAT",
            Error::NoChannels => "NO_CHANNELS",
            Error::PlaylistFetch(_) => "PLAYLIST_FETCH",
            Error::HttpStatus { .. } => "HTTP_STATUS",
            Error::Network(_) => "NETWORK",
            Error::Io(_) => "IO",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Store(_) => "STORE",
            Error::Serialization(_) => "SERIALIZATION",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ServiceClosed => "SERVICE_CLOSED",
        }
    }
}
