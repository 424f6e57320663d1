//! Playback Controller - stream lifecycle, recovery and preload policy
//!
//! Owns:
//! - the single active stream engine and the single preload engine
//! - the navigation state used for channel advance and preload targets
//! - deferred actions (next-channel preload, failure advance)
//!
//! The controller is synchronous. Collaborators report back through
//! [`PlaybackController::handle_engine_event`] and
//! [`PlaybackController::handle_sink_event`], and whoever drives it calls
//! [`PlaybackController::run_due`] when [`PlaybackController::next_deadline`]
//! passes (see [`crate::service::PlayerService`]).

use crate::{
    config::PlayerConfig,
    engine::{
        EngineError, EngineErrorKind, EngineEvent, EngineFactory, EngineId, OutputSink, SinkEvent,
        StreamEngine,
    },
    navigation::NavigationState,
    types::*,
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A channel was selected through navigation
    ChannelStarted { index: usize, channel: Channel },
    /// Loading indicator on/off
    LoadingChanged { loading: bool },
    /// Active manifest parsed
    ManifestReady { levels: Vec<QualityLevel> },
    QualitySwitched { level: QualityLevel },
    /// Next channel's manifest is warm
    PreloadReady { channel: Channel },
    /// Unrecoverable failure, channel advance pending
    AdvanceScheduled { delay_ms: u64 },
    Stopped,
}

/// Snapshot of the playback session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub active_channel: Option<Channel>,
    pub active_engine: Option<EngineId>,
    pub preload_engine: Option<EngineId>,
    pub preloaded_channel: Option<Channel>,
    pub is_loading: bool,
    pub state: PlaybackState,
}

/// Owned engine instance. Destroyed at most once, and on drop.
struct EngineHandle {
    id: EngineId,
    engine: Box<dyn StreamEngine>,
    manifest_ready: bool,
    destroyed: bool,
}

impl EngineHandle {
    fn new(id: EngineId, engine: Box<dyn StreamEngine>) -> Self {
        Self {
            id,
            engine,
            manifest_ready: false,
            destroyed: false,
        }
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.engine.destroy();
            self.destroyed = true;
            debug!(engine = %self.id, "Engine destroyed");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Warm up whatever channel is "next" when this fires
    Preload,
    /// Skip to the next channel, unless playback moved on since `generation`
    Advance { generation: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    action: Deferred,
}

/// Single-owner playback controller
pub struct PlaybackController<F: EngineFactory, S: OutputSink> {
    config: PlayerConfig,
    factory: F,
    sink: S,
    navigation: NavigationState,

    active_channel: Option<Channel>,
    active_engine: Option<EngineHandle>,
    preload_engine: Option<EngineHandle>,
    /// Channel whose manifest the preload engine is fetching
    preload_candidate: Option<Channel>,
    preloaded_channel: Option<Channel>,
    is_loading: bool,
    play_issued: bool,

    /// Bumped on every play/stop; stale advances compare against it
    generation: u64,
    next_engine_id: u64,
    timers: Vec<Timer>,

    state: PlaybackState,
    state_tx: watch::Sender<PlaybackState>,
    events_tx: broadcast::Sender<PlayerEvent>,
}

impl<F: EngineFactory, S: OutputSink> PlaybackController<F, S> {
    pub fn new(config: PlayerConfig, factory: F, sink: S) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            config,
            factory,
            sink,
            navigation: NavigationState::default(),
            active_channel: None,
            active_engine: None,
            preload_engine: None,
            preload_candidate: None,
            preloaded_channel: None,
            is_loading: false,
            play_issued: false,
            generation: 0,
            next_engine_id: 0,
            timers: Vec::new(),
            state: PlaybackState::Idle,
            state_tx,
            events_tx,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events_tx.subscribe()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn session(&self) -> PlaybackSession {
        PlaybackSession {
            active_channel: self.active_channel.clone(),
            active_engine: self.active_engine.as_ref().map(|h| h.id),
            preload_engine: self.preload_engine.as_ref().map(|h| h.id),
            preloaded_channel: self.preloaded_channel.clone(),
            is_loading: self.is_loading,
            state: self.state,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Replace the channel list. Playback is stopped since every engine
    /// refers to the old list.
    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        if self.active_channel.is_some() || self.preload_engine.is_some() {
            self.stop();
        }
        info!(channels = channels.len(), "Channel list replaced");
        self.navigation.set_channels(channels);
    }

    /// Select and play the channel at `index`
    pub fn play_index(&mut self, index: usize) {
        let Some(channel) = self.navigation.select(index).cloned() else {
            warn!(index, len = self.navigation.len(), "Invalid channel index");
            return;
        };

        info!(
            "Playing: [{}/{}] {}",
            index + 1,
            self.navigation.len(),
            channel.name
        );
        self.emit(PlayerEvent::ChannelStarted {
            index,
            channel: channel.clone(),
        });
        self.play_channel(channel);
    }

    pub fn play_next(&mut self) {
        match self.navigation.next_index() {
            Some(index) => self.play_index(index),
            None => debug!("No channels to advance to"),
        }
    }

    pub fn play_previous(&mut self) {
        match self.navigation.previous_index() {
            Some(index) => self.play_index(index),
            None => debug!("No channels to go back to"),
        }
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Start playing `channel`, replacing whatever is active
    pub fn play_channel(&mut self, channel: Channel) {
        if channel.url.is_empty() {
            warn!(name = %channel.name, "Channel has no URL");
            return;
        }

        info!(name = %channel.name, url = %channel.url, "Loading channel");
        self.generation += 1;
        self.play_issued = false;
        self.set_loading(true);
        self.set_state(PlaybackState::Loading);

        if let Some(mut handle) = self.active_engine.take() {
            handle.destroy();
        }

        // A warm preload engine for this exact channel is promoted instead of discarded
        let promoted = if self.is_preloaded(&channel) {
            self.preloaded_channel = None;
            self.preload_engine.take()
        } else {
            self.discard_preload();
            None
        };

        let kind = channel.stream_kind();
        let url = channel.url.clone();
        self.active_channel = Some(channel);

        match kind {
            StreamKind::Adaptive if self.factory.is_supported() => match promoted {
                Some(handle) => self.start_promoted(handle),
                None => self.start_adaptive(&url),
            },
            StreamKind::Adaptive => {
                warn!("Adaptive engine not supported, using native playback");
                self.start_direct(&url);
            }
            StreamKind::Direct => self.start_direct(&url),
        }

        if self.config.preload_enabled {
            self.schedule(self.config.preload_delay(), Deferred::Preload);
        }
    }

    fn start_adaptive(&mut self, url: &str) {
        let id = self.allocate_engine_id();
        let mut engine = self.factory.create(id, &self.config.engine);
        engine.attach_output(&self.sink);
        engine.load_source(url);
        debug!(engine = %id, "Adaptive engine created");
        self.active_engine = Some(EngineHandle::new(id, engine));
    }

    fn start_promoted(&mut self, mut handle: EngineHandle) {
        info!(engine = %handle.id, "Using preloaded manifest");
        handle.engine.attach_output(&self.sink);
        handle.engine.set_current_level(QualitySelection::Auto);
        handle.engine.start_load();
        self.active_engine = Some(handle);
        self.issue_play();
    }

    fn start_direct(&mut self, url: &str) {
        debug!("Direct stream");
        self.sink.set_source(url);
        self.issue_play();
    }

    fn issue_play(&mut self) {
        self.play_issued = true;
        if let Err(e) = self.sink.play() {
            warn!(error = %e, "Play error");
            self.set_loading(false);
        }
    }

    /// Pause, clear the sink and destroy every engine
    pub fn stop(&mut self) {
        self.sink.pause();
        self.sink.clear_source();

        if let Some(mut handle) = self.active_engine.take() {
            handle.destroy();
        }
        self.discard_preload();

        self.active_channel = None;
        self.play_issued = false;
        self.generation += 1;
        self.timers.clear();
        self.set_loading(false);
        self.set_state(PlaybackState::Idle);
        self.emit(PlayerEvent::Stopped);

        info!("Stopped");
    }

    pub fn toggle_play_pause(&mut self) {
        if self.active_channel.is_none() {
            debug!("Nothing to toggle");
            return;
        }

        if self.sink.is_paused() {
            match self.sink.play() {
                Ok(()) => {
                    let resumed = if self.is_loading {
                        PlaybackState::Loading
                    } else {
                        PlaybackState::Playing
                    };
                    self.set_state(resumed);
                    info!("Resumed");
                }
                Err(e) => warn!(error = %e, "Resume failed"),
            }
        } else {
            self.sink.pause();
            self.set_state(PlaybackState::Paused);
            info!("Paused");
        }
    }

    pub fn set_quality(&mut self, selection: QualitySelection) {
        match self.active_engine.as_mut() {
            Some(handle) => {
                handle.engine.set_current_level(selection);
                info!(quality = %selection, "Quality set");
            }
            None => debug!("No adaptive stream, quality unchanged"),
        }
    }

    /// Renditions of the active stream (empty for direct streams)
    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.active_engine
            .as_ref()
            .map(|h| h.engine.levels())
            .unwrap_or_default()
    }

    pub fn current_quality(&self) -> Option<QualitySelection> {
        self.active_engine.as_ref().map(|h| h.engine.current_level())
    }

    // =========================================================================
    // Engine and sink events
    // =========================================================================

    pub fn handle_engine_event(&mut self, id: EngineId, event: EngineEvent) {
        if self.active_engine.as_ref().is_some_and(|h| h.id == id) {
            self.on_active_event(event);
        } else if self.preload_engine.as_ref().is_some_and(|h| h.id == id) {
            self.on_preload_event(event);
        } else {
            debug!(engine = %id, ?event, "Ignoring event from retired engine");
        }
    }

    fn on_active_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ManifestReady => {
                let levels = match self.active_engine.as_mut() {
                    Some(handle) => {
                        handle.manifest_ready = true;
                        handle.engine.set_current_level(QualitySelection::Auto);
                        handle.engine.levels()
                    }
                    None => return,
                };
                info!(levels = levels.len(), "Manifest parsed, starting playback");
                self.emit(PlayerEvent::ManifestReady { levels });

                if !self.play_issued {
                    self.issue_play();
                }
            }
            EngineEvent::QualitySwitching { level } => {
                debug!(level, "Switching quality level");
            }
            EngineEvent::QualitySwitched { level } => {
                let found = self
                    .quality_levels()
                    .into_iter()
                    .find(|l| l.index == level);
                match found {
                    Some(quality) => {
                        info!("Quality: {}p @ {}kbps", quality.height, quality.bitrate / 1000);
                        self.emit(PlayerEvent::QualitySwitched { level: quality });
                    }
                    None => debug!(level, "Switched to unknown quality level"),
                }
            }
            EngineEvent::FragmentLoaded => {
                if self.is_loading {
                    self.set_loading(false);
                    self.set_state(PlaybackState::Playing);
                }
            }
            EngineEvent::Error(error) => self.on_active_error(error),
        }
    }

    fn on_active_error(&mut self, error: EngineError) {
        warn!(kind = %error.kind, details = %error.details, fatal = error.fatal, "Stream error");

        if !error.fatal {
            return;
        }

        let Some(handle) = self.active_engine.as_mut() else {
            return;
        };

        match error.kind {
            EngineErrorKind::Network => {
                info!("Network error, attempting recovery");
                handle.engine.start_load();
            }
            EngineErrorKind::Media => {
                info!("Media error, attempting recovery");
                handle.engine.recover_media_error();
            }
            EngineErrorKind::Other => {
                warn!("Fatal error, cannot recover");
                self.fail_current();
            }
        }
    }

    fn on_preload_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ManifestReady => {
                if let Some(handle) = self.preload_engine.as_mut() {
                    handle.manifest_ready = true;
                }
                if let Some(channel) = self.preload_candidate.take() {
                    info!(name = %channel.name, "Next channel manifest preloaded");
                    self.preloaded_channel = Some(channel.clone());
                    self.emit(PlayerEvent::PreloadReady { channel });
                }
            }
            EngineEvent::Error(error) => {
                debug!(details = %error.details, "Preload failed");
                self.discard_preload();
            }
            _ => {}
        }
    }

    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Playing => {
                debug!("Video playing");
                self.set_loading(false);
                if self.state == PlaybackState::Loading {
                    self.set_state(PlaybackState::Playing);
                }
            }
            SinkEvent::CanPlay => {
                debug!("Can play");
                self.set_loading(false);
            }
            SinkEvent::Waiting => {
                if self.active_channel.is_some() {
                    debug!("Buffering");
                    self.set_loading(true);
                }
            }
            SinkEvent::Stalled => warn!("Stream stalled"),
            SinkEvent::Error { message } => {
                if self.active_channel.is_none() {
                    debug!(%message, "Sink error while idle");
                    return;
                }
                warn!(%message, "Video error");
                self.fail_current();
            }
        }
    }

    /// Unrecoverable failure of the current channel
    fn fail_current(&mut self) {
        self.set_loading(false);
        self.set_state(PlaybackState::Error);

        let generation = self.generation;
        let pending = self
            .timers
            .iter()
            .any(|t| t.action == Deferred::Advance { generation });
        if pending {
            return;
        }

        let delay = self.config.failure_advance_delay();
        self.schedule(delay, Deferred::Advance { generation });
        self.emit(PlayerEvent::AdvanceScheduled {
            delay_ms: delay.as_millis() as u64,
        });
    }

    // =========================================================================
    // Preload
    // =========================================================================

    fn is_preloaded(&self, channel: &Channel) -> bool {
        self.preloaded_channel.as_ref() == Some(channel)
            && self.preload_engine.as_ref().is_some_and(|h| h.manifest_ready)
    }

    fn discard_preload(&mut self) {
        if let Some(mut handle) = self.preload_engine.take() {
            handle.destroy();
        }
        self.preload_candidate = None;
        self.preloaded_channel = None;
    }

    /// Warm up the manifest of the channel after the current index.
    /// Best effort; direct streams are never preloaded.
    pub fn preload_next_channel(&mut self) {
        if self.active_channel.is_none() {
            return;
        }

        let Some(next) = self.navigation.peek_next().cloned() else {
            return;
        };
        if next.url.is_empty()
            || next.stream_kind() != StreamKind::Adaptive
            || !self.factory.is_supported()
        {
            return;
        }
        if self.active_channel.as_ref() == Some(&next) {
            return;
        }
        let in_flight = self.preloaded_channel.as_ref() == Some(&next)
            || self.preload_candidate.as_ref() == Some(&next);
        if in_flight && self.preload_engine.is_some() {
            return;
        }

        info!(name = %next.name, "Preloading next channel");
        self.discard_preload();

        let id = self.allocate_engine_id();
        let mut engine = self.factory.create(id, &self.config.engine.preload());
        engine.load_source(&next.url);

        self.preload_engine = Some(EngineHandle::new(id, engine));
        self.preload_candidate = Some(next);
    }

    // =========================================================================
    // Deferred actions
    // =========================================================================

    /// Earliest pending deferred action
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.first().map(|t| t.deadline)
    }

    /// Run every deferred action due at `now`; returns how many ran
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while self.timers.first().is_some_and(|t| t.deadline <= now) {
            let timer = self.timers.remove(0);
            self.run_deferred(timer.action);
            ran += 1;
        }
        ran
    }

    fn run_deferred(&mut self, action: Deferred) {
        match action {
            Deferred::Preload => self.preload_next_channel(),
            Deferred::Advance { generation } => {
                if generation != self.generation || self.active_channel.is_none() {
                    debug!("Dropping stale channel advance");
                    return;
                }
                info!("Skipping to next channel due to error");
                self.play_next();
            }
        }
    }

    fn schedule(&mut self, delay: Duration, action: Deferred) {
        let deadline = Instant::now() + delay;
        let pos = self.timers.partition_point(|t| t.deadline <= deadline);
        self.timers.insert(pos, Timer { deadline, action });
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate_engine_id(&mut self) -> EngineId {
        self.next_engine_id += 1;
        EngineId(self.next_engine_id)
    }

    fn set_loading(&mut self, loading: bool) {
        if self.is_loading != loading {
            self.is_loading = loading;
            self.emit(PlayerEvent::LoadingChanged { loading });
        }
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        let current = self.state;
        if current == new_state {
            return;
        }
        if !current.can_transition_to(new_state) {
            warn!(from = %current, to = %new_state, "Ignoring invalid state transition");
            return;
        }

        self.state = new_state;
        let _ = self.state_tx.send(new_state);
        debug!(from = %current, to = %new_state, "State transition");
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events_tx.send(event);
    }
}
