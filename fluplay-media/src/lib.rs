//! # fluplay Media
//!
//! Renderer seams and segment buffering for fluplay. This crate defines what
//! the player needs from a media renderer, keeps one ordered segment queue per
//! track, and serializes appends against each sink's readiness.

#![warn(clippy::all)]

pub mod codecs;
pub mod memory;
pub mod render;
pub mod tracks;

// Re-export main types
pub use codecs::{TrackKind, AUDIO_MIME_TYPE, VIDEO_MIME_TYPE};
pub use memory::{MemoryHandle, MemoryRenderer, SinkRecord};
pub use render::{MediaRenderer, RenderError, TrackSink};
pub use tracks::{DropReason, EnqueueOutcome, Track, TrackBuffers};
