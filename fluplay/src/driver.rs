//! Async driver and the cloneable control handle
//!
//! The driver owns the [`Player`] and is the only task that touches it. It
//! waits on three sources at once: the dispatch queue, commands from
//! [`PlayerHandle`]s, and the flow timer deadline. After every step it
//! publishes a fresh [`PlaybackStatus`].

use crate::player::Player;
use crate::status::PlaybackStatus;
use fluplay_core::{DispatchQueue, FluError};
use fluplay_media::MediaRenderer;
use fluplay_signaling::{Connector, SeekTarget};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, info_span, Instrument};

/// Request from a [`PlayerHandle`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Jump to a real time or to the live edge
    Seek(SeekTarget),
    /// Change the playback rate
    SetRate(f64),
    /// Switch to another stream URL
    SetUrl(String),
    /// Stop the player and end the driver
    Stop,
}

/// Task running a [`Player`]
pub struct PlayerDriver<R: MediaRenderer, C: Connector> {
    player: Player<R, C>,
    queue: DispatchQueue,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    status: watch::Sender<PlaybackStatus>,
}

impl<R, C> PlayerDriver<R, C>
where
    R: MediaRenderer + 'static,
    C: Connector + 'static,
{
    /// Wrap `player`, draining events from `queue`
    pub fn new(player: Player<R, C>, queue: DispatchQueue) -> (Self, PlayerHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(player.status());
        let driver = Self {
            player,
            queue,
            commands,
            status,
        };
        let handle = PlayerHandle {
            commands: command_tx,
            status: status_rx,
        };
        (driver, handle)
    }

    /// Spawn the driver on the current tokio runtime
    pub fn spawn(player: Player<R, C>, queue: DispatchQueue) -> (PlayerHandle, JoinHandle<()>) {
        let (driver, handle) = Self::new(player, queue);
        (handle, tokio::spawn(driver.run()))
    }

    /// Run until the player is stopped or every handle is dropped
    pub async fn run(self) {
        let span = info_span!("player", session = %self.player.session_id());
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) {
        info!("player driver started");
        loop {
            let deadline = self.player.next_tick();
            tokio::select! {
                event = self.queue.recv() => {
                    if let Some(event) = event {
                        self.player.handle(event);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("all player handles dropped");
                        self.player.stop();
                    }
                },
                _ = wait_until(deadline) => self.player.tick(Instant::now()),
            }
            self.status.send_replace(self.player.status());
            if self.player.is_stopped() {
                break;
            }
        }
        info!("player driver finished");
    }

    fn apply(&mut self, command: PlayerCommand) {
        debug!("player command: {:?}", command);
        match command {
            PlayerCommand::Play => self.player.play(),
            PlayerCommand::Pause => self.player.pause(),
            PlayerCommand::Seek(target) => self.player.seek(target),
            PlayerCommand::SetRate(rate) => self.player.set_rate(rate),
            PlayerCommand::SetUrl(url) => self.player.set_url(url),
            PlayerCommand::Stop => self.player.stop(),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cloneable control handle for a running player
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    status: watch::Receiver<PlaybackStatus>,
}

impl PlayerHandle {
    /// Start playback
    pub fn play(&self) -> Result<(), FluError> {
        self.send(PlayerCommand::Play)
    }

    /// Pause playback
    pub fn pause(&self) -> Result<(), FluError> {
        self.send(PlayerCommand::Pause)
    }

    /// Jump to a real time (seconds since the Unix epoch) or to the live edge
    pub fn seek(&self, target: impl Into<SeekTarget>) -> Result<(), FluError> {
        self.send(PlayerCommand::Seek(target.into()))
    }

    /// Change the playback rate
    pub fn set_rate(&self, rate: f64) -> Result<(), FluError> {
        self.send(PlayerCommand::SetRate(rate))
    }

    /// Switch to another stream URL
    pub fn set_url(&self, url: impl Into<String>) -> Result<(), FluError> {
        self.send(PlayerCommand::SetUrl(url.into()))
    }

    /// Stop the player; the driver exits afterwards
    pub fn stop(&self) -> Result<(), FluError> {
        self.send(PlayerCommand::Stop)
    }

    /// Latest status snapshot
    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    /// Current real time, once known
    pub fn time(&self) -> Option<f64> {
        self.status.borrow().time
    }

    /// Current playback rate
    pub fn rate(&self) -> f64 {
        self.status.borrow().rate
    }

    /// Wait for the next status update
    ///
    /// Fails once the driver has exited.
    pub async fn changed(&mut self) -> Result<PlaybackStatus, FluError> {
        self.status.changed().await.map_err(|_| stopped())?;
        Ok(self.status.borrow_and_update().clone())
    }

    /// Whether the driver is still running
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: PlayerCommand) -> Result<(), FluError> {
        self.commands.send(command).map_err(|_| stopped())
    }
}

fn stopped() -> FluError {
    FluError::InvalidState {
        expected: "running player".to_string(),
        actual: "stopped".to_string(),
    }
}
