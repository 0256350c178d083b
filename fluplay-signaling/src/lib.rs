//! # fluplay Signaling
//!
//! Control protocol, connection lifecycle and WebSocket transport for fluplay.
//! Handles command encoding, control message parsing, socket bookkeeping and
//! reconnect policy.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod protocol;
pub mod transport;

// Re-export main types
pub use connection::{Connection, ConnectionState, Inbound, ReconnectDecision, ReconnectPolicy};
pub use protocol::{
    Command, InitMetadata, InitSegment, InitTrack, SeekTarget, ServerMessage, TrackMetadata,
    LIVE_SENTINEL,
};
pub use transport::{Connector, Transport, WebSocketConnector, DEFAULT_CONNECT_TIMEOUT};
