//! # fluplay Core
//!
//! Foundational types for the fluplay live segment player: the error type,
//! the dispatch events every collaborator reports through, the real-time
//! clock and the binary segment wire format.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod event;
pub mod segment;

// Re-export main types
pub use clock::PlaybackClock;
pub use error::FluError;
pub use event::{
    ConnectionEvent, ConnectionEventKind, ConnectionId, DispatchEvent, DispatchQueue, Dispatcher,
    RendererEvent, TrackId, WireMessage,
};
pub use segment::{Segment, MIN_SEGMENT_LEN};
