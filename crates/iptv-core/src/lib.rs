//! IPTV Core - Channel playback library for M3U playlists
//!
//! This crate provides the core functionality of an IPTV player:
//! - Extended M3U playlist parsing (names, logos, groups, EPG URL)
//! - Playlist loading from URLs and local files
//! - Channel navigation with wraparound
//! - Playback control with error recovery and next-channel preload
//! - Library persistence (playlists, last channel, first run)
//! - Stream reachability probing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          IPTV Core                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playlist   │  │   Playlist   │  │   Library    │           │
//! │  │    Loader    │──│    Parser    │  │    Store     │           │
//! │  └──────┬───────┘  └──────────────┘  └──────────────┘           │
//! │         │ channels                                              │
//! │  ┌──────┴───────┐        commands / events                      │
//! │  │    Player    │◄──────────────────────── PlayerHandle         │
//! │  │   Service    │                                               │
//! │  └──────┬───────┘                                               │
//! │         │                                                       │
//! │  ┌──────┴───────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Playback   │──│    Stream    │  │    Output    │           │
//! │  │  Controller  │  │ Engine(s)    │  │     Sink     │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stream engines and the output sink are supplied by the embedding
//! application through the traits in [`engine`].

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod loader;
pub mod navigation;
pub mod parser;
pub mod probe;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{EngineConfig, LoaderConfig, PlayerConfig};
pub use controller::{PlaybackController, PlaybackSession, PlayerEvent};
pub use engine::{
    EngineError, EngineErrorKind, EngineEvent, EngineFactory, EngineId, OutputSink, SinkError,
    SinkEvent, StreamEngine,
};
pub use error::{Error, Result};
pub use loader::PlaylistLoader;
pub use navigation::NavigationState;
pub use parser::ParsedPlaylist;
pub use probe::{ProbeReport, StreamProbe};
pub use service::{PlayerCommand, PlayerHandle, PlayerMessage, PlayerService};
pub use store::{JsonFileStore, KeyValueStore, LastChannel, Library, MemoryStore};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "IPTV Core initialized");
}
