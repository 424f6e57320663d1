//! Stream engine and output sink seams
//!
//! The adaptive-bitrate transport (manifest and segment fetching) and the
//! playable media element live outside this crate. The controller drives them
//! through these traits and receives their events as [`EngineEvent`] /
//! [`SinkEvent`] values.

use crate::config::EngineConfig;
use crate::types::{QualityLevel, QualitySelection};
use serde::{Deserialize, Serialize};

/// Identifies one engine instance for the lifetime of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineId(pub u64);

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// Creates adaptive stream engines
pub trait EngineFactory {
    /// Whether adaptive playback is available at all in this environment
    fn is_supported(&self) -> bool;

    /// Construct an engine. The engine tags every event it emits with `id`.
    fn create(&mut self, id: EngineId, config: &EngineConfig) -> Box<dyn StreamEngine>;
}

/// One adaptive stream engine instance
pub trait StreamEngine {
    fn load_source(&mut self, url: &str);

    fn attach_output(&mut self, sink: &dyn OutputSink);

    /// (Re)start the fragment load pipeline
    fn start_load(&mut self);

    /// Attempt in-place recovery from a decode error
    fn recover_media_error(&mut self);

    fn current_level(&self) -> QualitySelection;

    fn set_current_level(&mut self, level: QualitySelection);

    /// Available renditions, in engine order
    fn levels(&self) -> Vec<QualityLevel>;

    /// Release all resources. Must tolerate repeated calls.
    fn destroy(&mut self);
}

/// Playable media element
pub trait OutputSink {
    /// Request playback. Confirmation arrives later as [`SinkEvent::Playing`].
    fn play(&mut self) -> Result<(), SinkError>;

    fn pause(&mut self);

    fn set_source(&mut self, url: &str);

    fn clear_source(&mut self);

    fn is_paused(&self) -> bool;
}

/// Rejected play request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Play request rejected: {0}")]
pub struct SinkError(pub String);

/// Engine error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// Manifest/level/fragment transport failure
    Network,
    /// Decode or media buffer failure
    Media,
    Other,
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorKind::Network => write!(f, "networkError"),
            EngineErrorKind::Media => write!(f, "mediaError"),
            EngineErrorKind::Other => write!(f, "otherError"),
        }
    }
}

/// Error reported by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineError {
    pub fatal: bool,
    pub kind: EngineErrorKind,
    /// Engine-specific detail string
    pub details: String,
}

impl EngineError {
    pub fn fatal(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: true,
            kind,
            details: details.into(),
        }
    }

    pub fn non_fatal(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: false,
            kind,
            details: details.into(),
        }
    }
}

/// Events emitted by a stream engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Manifest parsed, quality levels known
    ManifestReady,
    QualitySwitching { level: usize },
    QualitySwitched { level: usize },
    FragmentLoaded,
    Error(EngineError),
}

/// Events emitted by the output sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Playing,
    /// Playback waiting on data
    Waiting,
    CanPlay,
    Error { message: String },
    Stalled,
}
