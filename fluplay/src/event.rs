//! Events reported to the player's owner

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Playback events for the owner of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Playback started
    Play,
    /// Playback paused
    Pause,
    /// Playback position advanced
    Progress {
        /// Current real time, seconds since the Unix epoch
        time: f64,
    },
    /// The socket dropped during playback and a new one is being opened
    Reconnecting {
        /// Consecutive attempt number
        attempt: u32,
    },
    /// The player stopped trying to reach the server
    Disconnected {
        /// Reason for giving up
        reason: String,
    },
}

impl Event {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Play => "play",
            Event::Pause => "pause",
            Event::Progress { .. } => "progress",
            Event::Reconnecting { .. } => "reconnecting",
            Event::Disconnected { .. } => "disconnected",
        }
    }

    /// Check if this is a connection-related event
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            Event::Reconnecting { .. } | Event::Disconnected { .. }
        )
    }
}

/// Stream of player events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<Event>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        assert_eq!(Event::Play.event_type(), "play");
        assert_eq!(Event::Progress { time: 1.0 }.event_type(), "progress");
        assert!(Event::Reconnecting { attempt: 1 }.is_connection_event());
        assert!(!Event::Pause.is_connection_event());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&Event::Reconnecting { attempt: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"reconnecting","attempt":2}"#);
    }

    #[tokio::test]
    async fn test_event_stream_basic() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = EventStream::new(rx);

        tx.send(Event::Play).unwrap();
        assert_eq!(events.next().await, Some(Event::Play));
        assert_eq!(events.try_next().unwrap(), None);

        drop(tx);
        assert!(events.try_next().is_err());
    }
}
