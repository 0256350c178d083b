//! Per-track segment queues feeding renderer sinks
//!
//! Each track owns a FIFO of parsed segments and the sink they go to. A sink
//! accepts one append at a time, so segments are handed over only when the
//! sink is idle: on enqueue if nothing is in flight, and otherwise from the
//! sink's append-complete event. A refused append does not leave the sink
//! waiting for a completion that never comes; the next segment goes in its
//! place. The pump never double-appends.

use crate::codecs::TrackKind;
use crate::render::{RenderError, TrackSink};
use bytes::Bytes;
use fluplay_core::{PlaybackClock, Segment, TrackId};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Why a segment was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No sink registered for the segment's track id
    UnknownTrack,
    /// Timestamp not newer than the real-time cursor
    Stale,
    /// Sink refused the append
    Rejected,
}

/// Result of [`TrackBuffers::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Segment went straight to the sink
    Appended,
    /// Segment waits behind an in-flight append
    Queued,
    /// Segment was discarded
    Dropped(DropReason),
}

/// One media track and its renderer sink
///
/// Dropping a track aborts any in-flight append and detaches the sink, so
/// the renderer side is released however the track goes away.
pub struct Track {
    id: TrackId,
    kind: TrackKind,
    sink: Box<dyn TrackSink>,
    queue: VecDeque<Segment>,
}

impl Track {
    fn new(id: TrackId, kind: TrackKind, sink: Box<dyn TrackSink>) -> Self {
        Self {
            id,
            kind,
            sink,
            queue: VecDeque::new(),
        }
    }

    /// Track id
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Content kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Number of segments waiting for the sink
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// End of the sink's buffered range
    pub fn buffered_end(&self) -> Option<f64> {
        self.sink.buffered_end()
    }

    /// Feed the sink from the queue while it is idle
    ///
    /// A refused segment is discarded and the next one is tried, so the
    /// queue never sits behind an idle sink.
    fn pump(&mut self) -> Pump {
        let mut pump = Pump::default();
        while !self.sink.is_updating() {
            let Some(segment) = self.queue.pop_front() else {
                break;
            };
            match self.sink.append(segment.into_data()) {
                Ok(()) => {
                    pump.appended = true;
                    break;
                }
                Err(e) => {
                    warn!("track {} rejected segment: {}", self.id, e);
                    pump.rejected += 1;
                }
            }
        }
        pump
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pump {
    appended: bool,
    rejected: usize,
}

impl Drop for Track {
    fn drop(&mut self) {
        debug!("clearing buffer, id: {}", self.id);
        self.sink.abort();
        self.sink.detach();
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("queued", &self.queue.len())
            .finish()
    }
}

/// Track Buffer Manager: all tracks of the current stream, keyed by id
#[derive(Debug, Default)]
pub struct TrackBuffers {
    tracks: HashMap<TrackId, Track>,
}

impl TrackBuffers {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
        }
    }

    /// Register a track and push its initialization payload
    ///
    /// Any previous track with the same id is released first. The init
    /// payload bypasses the queue; the sink's append-complete event for it
    /// starts the regular pump.
    pub fn init_track(
        &mut self,
        kind: TrackKind,
        track_id: TrackId,
        sink: Box<dyn TrackSink>,
        init_payload: Bytes,
    ) -> Result<(), RenderError> {
        self.tracks.remove(&track_id);

        let mut track = Track::new(track_id, kind, sink);
        track.sink.set_sequence_mode();
        track.sink.append(init_payload)?;

        debug!("buffer initialized, type: {}, track id: {}", kind, track_id);
        self.tracks.insert(track_id, track);
        Ok(())
    }

    /// Queue a segment for its track
    ///
    /// Segments for unknown tracks and segments not newer than the clock's
    /// cursor are dropped. An accepted video segment advances the cursor and,
    /// if the clock awaits a fresh sequence, anchors it at `local_position`.
    pub fn enqueue(
        &mut self,
        segment: Segment,
        clock: &mut PlaybackClock,
        local_position: f64,
    ) -> EnqueueOutcome {
        let Some(track) = self.tracks.get_mut(&segment.track_id()) else {
            return EnqueueOutcome::Dropped(DropReason::UnknownTrack);
        };

        let moment = segment.timestamp();
        if moment <= clock.cursor() {
            debug!("skip segment with small pts: {}", moment);
            return EnqueueOutcome::Dropped(DropReason::Stale);
        }

        let was_empty = track.queue.is_empty();
        track.queue.push_back(segment);

        if track.kind.is_video() {
            clock.advance(moment);
            if clock.anchor(moment, local_position) {
                debug!("start segment received, segment time: {}", moment);
            }
        }

        let pump = track.pump();
        match (was_empty, pump.appended) {
            (true, true) => EnqueueOutcome::Appended,
            // the only queued segment was this one
            (true, false) if pump.rejected > 0 => EnqueueOutcome::Dropped(DropReason::Rejected),
            _ => EnqueueOutcome::Queued,
        }
    }

    /// Continue the pump after a sink finished its append
    ///
    /// Returns `true` if another segment was handed to the sink.
    pub fn on_append_complete(&mut self, track_id: TrackId) -> bool {
        let Some(track) = self.tracks.get_mut(&track_id) else {
            return false;
        };
        track.pump().appended
    }

    /// Release every track and its sink
    pub fn clear_all(&mut self) {
        self.tracks.clear();
    }

    /// Look up a track
    pub fn get(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// First video track, if one is registered
    pub fn video(&self) -> Option<&Track> {
        self.tracks.values().find(|track| track.kind.is_video())
    }

    /// End of the video sink's buffered range
    pub fn video_end_time(&self) -> Option<f64> {
        self.video().and_then(Track::buffered_end)
    }

    /// Number of registered tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if no track is registered
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
