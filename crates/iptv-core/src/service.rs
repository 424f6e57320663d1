//! Player service - serializes commands and collaborator events onto one task
//!
//! Engines, the output sink and the presentation layer all talk to the
//! controller through a [`PlayerHandle`]. The service owns the controller,
//! applies messages in arrival order and fires deferred actions when their
//! deadline passes.

use crate::{
    controller::{PlaybackController, PlayerEvent},
    engine::{EngineEvent, EngineFactory, EngineId, OutputSink, SinkEvent},
    types::{Channel, PlaybackState, QualitySelection},
    Error, Result,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// User-level player commands
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    SetChannels(Vec<Channel>),
    PlayIndex(usize),
    PlayNext,
    PlayPrevious,
    TogglePlayPause,
    SetQuality(QualitySelection),
    Stop,
}

/// Everything the service reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMessage {
    Command(PlayerCommand),
    Engine(EngineId, EngineEvent),
    Sink(SinkEvent),
    Shutdown,
}

/// Cloneable sender side of a [`PlayerService`]
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerMessage>,
}

impl PlayerHandle {
    pub fn send(&self, message: PlayerMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ServiceClosed)
    }

    pub fn command(&self, command: PlayerCommand) -> Result<()> {
        self.send(PlayerMessage::Command(command))
    }

    pub fn set_channels(&self, channels: Vec<Channel>) -> Result<()> {
        self.command(PlayerCommand::SetChannels(channels))
    }

    pub fn play_index(&self, index: usize) -> Result<()> {
        self.command(PlayerCommand::PlayIndex(index))
    }

    pub fn play_next(&self) -> Result<()> {
        self.command(PlayerCommand::PlayNext)
    }

    pub fn play_previous(&self) -> Result<()> {
        self.command(PlayerCommand::PlayPrevious)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.command(PlayerCommand::TogglePlayPause)
    }

    pub fn set_quality(&self, selection: QualitySelection) -> Result<()> {
        self.command(PlayerCommand::SetQuality(selection))
    }

    pub fn stop(&self) -> Result<()> {
        self.command(PlayerCommand::Stop)
    }

    /// Forward an event raised by engine `id`
    pub fn engine_event(&self, id: EngineId, event: EngineEvent) -> Result<()> {
        self.send(PlayerMessage::Engine(id, event))
    }

    pub fn sink_event(&self, event: SinkEvent) -> Result<()> {
        self.send(PlayerMessage::Sink(event))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerMessage::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Event loop around a [`PlaybackController`]
pub struct PlayerService<F: EngineFactory, S: OutputSink> {
    controller: PlaybackController<F, S>,
    rx: mpsc::UnboundedReceiver<PlayerMessage>,
}

impl<F: EngineFactory, S: OutputSink> PlayerService<F, S> {
    pub fn new(controller: PlaybackController<F, S>) -> (Self, PlayerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { controller, rx }, PlayerHandle { tx })
    }

    pub fn controller(&self) -> &PlaybackController<F, S> {
        &self.controller
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.controller.subscribe_state()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.controller.subscribe_events()
    }

    /// Run until [`PlayerMessage::Shutdown`] or every handle is dropped.
    /// Playback is stopped on exit and the controller handed back.
    pub async fn run(mut self) -> PlaybackController<F, S> {
        info!("Player service started");

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                message = self.rx.recv() => {
                    match message {
                        Some(PlayerMessage::Shutdown) | None => break,
                        Some(message) => self.dispatch(message),
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let ran = self.controller.run_due(Instant::now());
                    debug!(ran, "Deferred actions fired");
                }
            }
        }

        self.controller.stop();
        info!("Player service stopped");
        self.controller
    }

    fn dispatch(&mut self, message: PlayerMessage) {
        match message {
            PlayerMessage::Command(command) => self.apply(command),
            PlayerMessage::Engine(id, event) => self.controller.handle_engine_event(id, event),
            PlayerMessage::Sink(event) => self.controller.handle_sink_event(event),
            PlayerMessage::Shutdown => {}
        }
    }

    fn apply(&mut self, command: PlayerCommand) {
        debug!(?command, "Player command");
        match command {
            PlayerCommand::SetChannels(channels) => self.controller.set_channels(channels),
            PlayerCommand::PlayIndex(index) => self.controller.play_index(index),
            PlayerCommand::PlayNext => self.controller.play_next(),
            PlayerCommand::PlayPrevious => self.controller.play_previous(),
            PlayerCommand::TogglePlayPause => self.controller.toggle_play_pause(),
            PlayerCommand::SetQuality(selection) => self.controller.set_quality(selection),
            PlayerCommand::Stop => self.controller.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::engine::{EngineError, EngineErrorKind};
    use crate::testing::{channels, MockFactory, MockSink};
    use std::time::Duration;
    use tokio::time::sleep;

    fn service(
        pattern: &[bool],
    ) -> (PlayerService<MockFactory, MockSink>, PlayerHandle, MockFactory, MockSink) {
        let factory = MockFactory::new();
        let sink = MockSink::new();
        let controller =
            PlaybackController::new(PlayerConfig::default(), factory.clone(), sink.clone());
        let (service, handle) = PlayerService::new(controller);
        handle.set_channels(channels(pattern)).unwrap();
        (service, handle, factory, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_advances_after_delay() {
        let (service, handle, _factory, _sink) = service(&[false, false, false]);
        let state = service.subscribe_state();

        let script = async {
            handle.play_index(0).unwrap();
            handle
                .sink_event(SinkEvent::Error {
                    message: "MEDIA_ERR_NETWORK".to_string(),
                })
                .unwrap();

            sleep(Duration::from_millis(2900)).await;
            assert_eq!(*state.borrow(), PlaybackState::Error);

            sleep(Duration::from_millis(200)).await;
            assert_eq!(*state.borrow(), PlaybackState::Loading);
            handle.shutdown().unwrap();
        };

        let (controller, ()) = tokio::join!(service.run(), script);
        assert_eq!(controller.navigation().current(), Some(1));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_change_cancels_advance() {
        let (service, handle, _factory, _sink) = service(&[false, false, false]);

        let script = async {
            handle.play_index(0).unwrap();
            handle
                .sink_event(SinkEvent::Error {
                    message: "decode".to_string(),
                })
                .unwrap();
            sleep(Duration::from_secs(1)).await;
            handle.play_index(2).unwrap();
            sleep(Duration::from_secs(5)).await;
            handle.shutdown().unwrap();
        };

        let (controller, ()) = tokio::join!(service.run(), script);
        assert_eq!(controller.navigation().current(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_fires_and_promotes() {
        let (service, handle, factory, sink) = service(&[true, true]);

        let script = async {
            handle.play_index(0).unwrap();
            sleep(Duration::from_millis(2100)).await;

            let preload = factory.journal.borrow().last_created().unwrap();
            assert_eq!(factory.journal.borrow().created.len(), 2);
            handle.engine_event(preload, EngineEvent::ManifestReady).unwrap();
            handle.play_next().unwrap();
            sleep(Duration::from_millis(10)).await;

            assert_eq!(factory.journal.borrow().created.len(), 2);
            assert_eq!(sink.journal.borrow().play_calls, 1);
            handle.shutdown().unwrap();
        };

        let (controller, ()) = tokio::join!(service.run(), script);
        assert_eq!(controller.navigation().current(), Some(1));
        assert!(factory.journal.borrow().live.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_recovers_without_advance() {
        let (service, handle, factory, _sink) = service(&[true, true]);

        let script = async {
            handle.play_index(0).unwrap();
            sleep(Duration::from_millis(10)).await;
            let active = factory.journal.borrow().last_created().unwrap();
            handle
                .engine_event(
                    active,
                    EngineEvent::Error(EngineError::fatal(EngineErrorKind::Network, "levelLoadError")),
                )
                .unwrap();
            sleep(Duration::from_secs(5)).await;
            handle.shutdown().unwrap();
        };

        let (controller, ()) = tokio::join!(service.run(), script);
        assert_eq!(controller.navigation().current(), Some(0));
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_service() {
        let (service, handle, factory, _sink) = service(&[true]);
        handle.play_index(0).unwrap();
        drop(handle);

        let controller = service.run().await;
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(factory.journal.borrow().live.is_empty());
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let (service, handle, _factory, _sink) = service(&[]);
        handle.shutdown().unwrap();
        let controller = service.run().await;
        drop(controller);

        assert!(handle.is_closed());
        assert!(matches!(handle.play_next(), Err(Error::ServiceClosed)));
    }
}
