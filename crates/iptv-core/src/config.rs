//! Player, engine and loader configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Adaptive stream engine tuning profile.
///
/// Tuned for fast channel switching: a short forward buffer, a mid-high
/// initial bandwidth estimate, bounded retries, and little back buffer
/// since live channels are rarely rewound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Forward buffer target (seconds)
    pub max_buffer_length: f64,
    /// Forward buffer ceiling (seconds)
    pub max_max_buffer_length: f64,
    /// Forward buffer byte cap
    pub max_buffer_size: u64,
    /// Gaps smaller than this are jumped (seconds)
    pub max_buffer_hole: f64,
    /// Back buffer retention (seconds)
    pub back_buffer_length: f64,

    /// Live edge distance in target durations
    pub live_sync_duration_count: u32,
    /// Max live latency in target durations
    pub live_max_latency_duration_count: u32,
    pub low_latency_mode: bool,
    pub enable_worker: bool,

    /// Initial quality level (-1 = auto)
    pub start_level: i64,
    /// Start fetching fragments as soon as the manifest is parsed
    pub auto_start_load: bool,
    pub test_bandwidth: bool,
    /// Initial bandwidth estimate in bps
    pub abr_ewma_default_estimate: u64,
    pub abr_bandwidth_factor: f64,
    pub abr_bandwidth_up_factor: f64,

    pub manifest_loading_timeout_ms: u64,
    pub manifest_loading_max_retry: u32,
    pub manifest_loading_retry_delay_ms: u64,
    pub level_loading_timeout_ms: u64,
    pub level_loading_max_retry: u32,
    pub level_loading_retry_delay_ms: u64,
    pub frag_loading_timeout_ms: u64,
    pub frag_loading_max_retry: u32,
    pub frag_loading_retry_delay_ms: u64,
}

impl EngineConfig {
    /// Forward buffer target
    pub const MAX_BUFFER_LENGTH: f64 = 10.0;
    pub const MAX_MAX_BUFFER_LENGTH: f64 = 20.0;
    pub const MAX_BUFFER_SIZE: u64 = 60 * 1000 * 1000; // 60 MB
    pub const MAX_BUFFER_HOLE: f64 = 0.5;
    pub const BACK_BUFFER_LENGTH: f64 = 10.0;
    /// 5 Mbps, biased toward mid-high quality at startup
    pub const ABR_DEFAULT_ESTIMATE: u64 = 5_000_000;
    pub const MAX_RETRY: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 1000;
    pub const MANIFEST_TIMEOUT_MS: u64 = 10_000;
    pub const LEVEL_TIMEOUT_MS: u64 = 10_000;
    pub const FRAGMENT_TIMEOUT_MS: u64 = 20_000;

    /// Profile for manifest-only warm-up of the next channel
    pub fn preload(&self) -> Self {
        Self {
            auto_start_load: false,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_length <= 0.0 {
            return Err(Error::InvalidConfig(
                "max_buffer_length must be positive".to_string(),
            ));
        }
        if self.max_max_buffer_length < self.max_buffer_length {
            return Err(Error::InvalidConfig(
                "max_max_buffer_length must not be below max_buffer_length".to_string(),
            ));
        }
        if self.max_buffer_hole < 0.0 || self.back_buffer_length < 0.0 {
            return Err(Error::InvalidConfig(
                "buffer hole and back buffer must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_buffer_length: Self::MAX_BUFFER_LENGTH,
            max_max_buffer_length: Self::MAX_MAX_BUFFER_LENGTH,
            max_buffer_size: Self::MAX_BUFFER_SIZE,
            max_buffer_hole: Self::MAX_BUFFER_HOLE,
            back_buffer_length: Self::BACK_BUFFER_LENGTH,
            live_sync_duration_count: 3,
            live_max_latency_duration_count: 10,
            low_latency_mode: true,
            enable_worker: true,
            start_level: -1,
            auto_start_load: true,
            test_bandwidth: true,
            abr_ewma_default_estimate: Self::ABR_DEFAULT_ESTIMATE,
            abr_bandwidth_factor: 0.95,
            abr_bandwidth_up_factor: 0.7,
            manifest_loading_timeout_ms: Self::MANIFEST_TIMEOUT_MS,
            manifest_loading_max_retry: Self::MAX_RETRY,
            manifest_loading_retry_delay_ms: Self::RETRY_DELAY_MS,
            level_loading_timeout_ms: Self::LEVEL_TIMEOUT_MS,
            level_loading_max_retry: Self::MAX_RETRY,
            level_loading_retry_delay_ms: Self::RETRY_DELAY_MS,
            frag_loading_timeout_ms: Self::FRAGMENT_TIMEOUT_MS,
            frag_loading_max_retry: Self::MAX_RETRY,
            frag_loading_retry_delay_ms: Self::RETRY_DELAY_MS,
        }
    }
}

/// Playback controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Engine tuning profile
    pub engine: EngineConfig,
    /// Warm up the next channel's manifest after a channel starts
    pub preload_enabled: bool,
    /// Delay before preloading, leaves bandwidth to the new stream's initial buffering
    pub preload_delay_ms: u64,
    /// Delay before skipping a channel that failed unrecoverably
    pub failure_advance_delay_ms: u64,
    /// Channel info overlay auto-hide, consumed by the UI layer
    pub overlay_hide_delay_ms: u64,
}

impl PlayerConfig {
    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }

    pub fn failure_advance_delay(&self) -> Duration {
        Duration::from_millis(self.failure_advance_delay_ms)
    }

    pub fn overlay_hide_delay(&self) -> Duration {
        Duration::from_millis(self.overlay_hide_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            preload_enabled: true,
            preload_delay_ms: 2000,
            failure_advance_delay_ms: 3000,
            overlay_hide_delay_ms: 4000,
        }
    }
}

/// Playlist loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// User-Agent header sent with playlist requests
    pub user_agent: String,
}

impl LoaderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            user_agent: format!("iptv-core/{}", crate::VERSION),
        }
    }
}
