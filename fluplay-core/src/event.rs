//! Dispatch events shared by the connection, the renderer and the player
//!
//! Every collaborator reports what happened by pushing a [`DispatchEvent`]
//! into one queue. The player drains that queue on a single task, so all
//! state transitions happen in arrival order and never concurrently.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

/// Track identifier carried in the segment header
pub type TrackId = u8;

/// Identifier of one transport socket
///
/// A fresh id is allocated for every connection attempt so late events from
/// a socket that has already been replaced can be told apart.
pub type ConnectionId = u64;

/// Payload of one inbound transport frame
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Raw media segment
    Binary(Bytes),
    /// JSON control message
    Text(String),
}

/// What a transport socket reported
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEventKind {
    /// Socket is connected and can send
    Open,
    /// Socket closed, either side initiated
    Close,
    /// Socket reported an error; a close follows
    Error(String),
    /// Inbound frame
    Message(WireMessage),
}

/// Transport event tagged with the socket it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    /// Socket that produced the event
    pub id: ConnectionId,
    /// What happened
    pub kind: ConnectionEventKind,
}

impl ConnectionEvent {
    /// Create a new connection event
    pub fn new(id: ConnectionId, kind: ConnectionEventKind) -> Self {
        Self { id, kind }
    }
}

/// Renderer lifecycle and readiness notifications
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// Playback started
    Play,
    /// Playback paused
    Pause,
    /// Playback rate changed
    RateChange(f64),
    /// Local playback position advanced
    TimeUpdate,
    /// A freshly opened media source accepts track sinks
    SourceOpen,
    /// The sink for `track_id` finished its pending append
    AppendComplete {
        /// Track whose sink became idle
        track_id: TrackId,
    },
}

/// Single event type processed by the player
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// Event from a transport socket
    Connection(ConnectionEvent),
    /// Event from the renderer
    Renderer(RendererEvent),
}

impl From<ConnectionEvent> for DispatchEvent {
    fn from(event: ConnectionEvent) -> Self {
        DispatchEvent::Connection(event)
    }
}

impl From<RendererEvent> for DispatchEvent {
    fn from(event: RendererEvent) -> Self {
        DispatchEvent::Renderer(event)
    }
}

/// Cloneable producer side of the dispatch queue
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl Dispatcher {
    /// Push an event onto the queue
    ///
    /// Events sent after the player has shut down are discarded.
    pub fn dispatch(&self, event: impl Into<DispatchEvent>) {
        if self.tx.send(event.into()).is_err() {
            debug!("dispatch queue closed, event discarded");
        }
    }

    /// Push a connection event for socket `id`
    pub fn connection(&self, id: ConnectionId, kind: ConnectionEventKind) {
        self.dispatch(ConnectionEvent::new(id, kind));
    }

    /// Check if the consumer side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the dispatch queue
#[derive(Debug)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<DispatchEvent>,
    rx: mpsc::UnboundedReceiver<DispatchEvent>,
}

impl DispatchQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Get a producer handle for this queue
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<DispatchEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is ready
    pub fn try_recv(&mut self) -> Option<DispatchEvent> {
        self.rx.try_recv().ok()
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}
