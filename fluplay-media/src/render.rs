//! Renderer and track sink seams
//!
//! The player never decodes media itself. It hands raw segments to a
//! renderer through per-track sinks and reads back the buffered range and the
//! local playback position. Implementations report readiness and lifecycle
//! changes by dispatching [`RendererEvent`](fluplay_core::RendererEvent)s.

use crate::codecs::TrackKind;
use bytes::Bytes;
use fluplay_core::{FluError, TrackId};
use thiserror::Error;

/// Errors reported by renderer implementations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No media source is open to attach sinks to
    #[error("Media source not open")]
    SourceNotOpen,

    /// Sink already has an append in flight
    #[error("Sink for track {track_id} is busy")]
    SinkBusy {
        /// Track whose sink was busy
        track_id: TrackId,
    },

    /// Mime type rejected by the renderer
    #[error("Unsupported mime type: {mime_type}")]
    UnsupportedMimeType {
        /// Rejected mime type
        mime_type: String,
    },

    /// Sink was already detached from its source
    #[error("Sink for track {track_id} is detached")]
    Detached {
        /// Track whose sink was detached
        track_id: TrackId,
    },

    /// Anything else the backend reports
    #[error("Render backend error: {reason}")]
    Backend {
        /// Reason for the backend error
        reason: String,
    },
}

impl From<RenderError> for FluError {
    fn from(err: RenderError) -> Self {
        FluError::Render {
            reason: err.to_string(),
        }
    }
}

/// Renderer-side buffer accepting one track's segments
///
/// A sink accepts a single pending append at a time. When the append
/// finishes the renderer dispatches `RendererEvent::AppendComplete` for the
/// sink's track.
pub trait TrackSink: Send {
    /// Track this sink was created for
    fn track_id(&self) -> TrackId;

    /// Switch to sequential append mode (timestamps follow append order)
    fn set_sequence_mode(&mut self);

    /// Start appending raw bytes
    fn append(&mut self, data: Bytes) -> Result<(), RenderError>;

    /// Whether an append is still in flight
    fn is_updating(&self) -> bool;

    /// Abort the in-flight append, if any
    fn abort(&mut self);

    /// End of the last buffered time range, in renderer-local seconds
    fn buffered_end(&self) -> Option<f64>;

    /// Detach from the media source; no further events are dispatched
    fn detach(&mut self);
}

/// Media renderer driving a local playback clock
pub trait MediaRenderer: Send {
    /// Open a fresh media source; the local clock restarts at zero
    ///
    /// The renderer dispatches `RendererEvent::SourceOpen` once sinks can be
    /// added.
    fn open_source(&mut self) -> Result<(), RenderError>;

    /// Create a sink for one track on the open source
    fn add_track_sink(
        &mut self,
        track_id: TrackId,
        kind: TrackKind,
        mime_type: &str,
    ) -> Result<Box<dyn TrackSink>, RenderError>;

    /// Signal that no more data will be appended
    fn end_of_stream(&mut self);

    /// Local playback position in seconds
    fn position(&self) -> f64;

    /// Jump the local playback position
    fn set_position(&mut self, position: f64);

    /// Current playback rate
    fn rate(&self) -> f64;

    /// Change the playback rate
    fn set_rate(&mut self, rate: f64);

    /// Start playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);
}
