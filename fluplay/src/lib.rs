//! # fluplay - Low-Latency Live Segment Playback
//!
//! fluplay plays a live stream delivered as fragmented media segments pushed
//! over a WebSocket. It keeps the renderer's buffer just deep enough to avoid
//! stalls, follows the live edge as closely as the buffer allows, and
//! supports seeking into the past and back to live.
//!
//! ## Key Features
//!
//! - **Request/acknowledge command protocol**: one command in flight, stale
//!   media dropped until the server confirms
//! - **Per-track append serialization**: at most one append outstanding per
//!   renderer sink
//! - **Buffer-depth flow control**: pause above 10 s, re-seek and resume below
//!   5 s, live catch-up beyond 1.5 s of lag
//! - **Pluggable renderer and transport**: [`MediaRenderer`] and [`Connector`]
//!   seams with an in-memory renderer and a WebSocket connector included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fluplay::{DispatchQueue, MemoryRenderer, PlayerBuilder, PlayerDriver, WebSocketConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fluplay::FluError> {
//!     let queue = DispatchQueue::new();
//!     let renderer = MemoryRenderer::new(queue.dispatcher()).auto_complete(true);
//!
//!     let (player, mut events) = PlayerBuilder::new()
//!         .url("ws://localhost:8080/camera/mse_ld")
//!         .build(renderer, WebSocketConnector::new()?, queue.dispatcher())?;
//!
//!     let (handle, _task) = PlayerDriver::spawn(player, queue);
//!     handle.play()?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("player event: {:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use fluplay_core::{
    ConnectionEvent, ConnectionEventKind, ConnectionId, DispatchEvent, DispatchQueue, Dispatcher,
    FluError, PlaybackClock, RendererEvent, Segment, TrackId, WireMessage,
};

pub use fluplay_media::{
    MediaRenderer, MemoryHandle, MemoryRenderer, RenderError, TrackKind, TrackSink,
};

pub use fluplay_signaling::{
    Command, ConnectionState, Connector, ReconnectPolicy, SeekTarget, Transport,
    WebSocketConnector,
};

pub use fluplay_diagnostics::{DebugLogger, ReconnectReport};

// Public API modules
pub mod config;
pub mod driver;
pub mod event;
pub mod flow;
pub mod player;
pub mod status;

// Re-export main API types
pub use config::{FlowConfig, PlayerConfig};
pub use driver::{PlayerCommand, PlayerDriver, PlayerHandle};
pub use event::{Event, EventStream};
pub use flow::{FlowController, FlowTimer};
pub use player::{Player, PlayerBuilder};
pub use status::{PlaybackStats, PlaybackStatus};
