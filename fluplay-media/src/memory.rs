//! In-memory renderer
//!
//! Records everything the player asks of it and dispatches the same events a
//! real media element would. Useful for headless runs and for tests, which
//! drive append completion and the buffered range through a
//! [`MemoryHandle`].

use crate::codecs::TrackKind;
use crate::render::{MediaRenderer, RenderError, TrackSink};
use bytes::Bytes;
use fluplay_core::{Dispatcher, RendererEvent, TrackId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything recorded about one sink
#[derive(Debug, Clone)]
pub struct SinkRecord {
    /// Track the sink was created for
    pub track_id: TrackId,
    /// Track content
    pub kind: TrackKind,
    /// Mime type requested by the player
    pub mime_type: String,
    /// Whether sequence mode was switched on
    pub sequence_mode: bool,
    /// Every accepted append, in order
    pub appended: Vec<Bytes>,
    /// Append in flight
    pub updating: bool,
    /// End of the buffered range
    pub buffered_end: Option<f64>,
    /// Number of aborted in-flight appends
    pub aborted: u32,
    /// Appends refused because one was already in flight
    pub busy_appends: u32,
    /// Sink was released by the player
    pub detached: bool,
}

#[derive(Debug)]
struct MemoryState {
    position: f64,
    rate: f64,
    playing: bool,
    sources_opened: u32,
    ended: bool,
    sinks: Vec<SinkRecord>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
            playing: false,
            sources_opened: 0,
            ended: false,
            sinks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SinkBehavior {
    auto_complete: bool,
    segment_duration: Option<f64>,
}

/// Renderer keeping all state in memory
#[derive(Debug)]
pub struct MemoryRenderer {
    state: Arc<Mutex<MemoryState>>,
    dispatcher: Dispatcher,
    behavior: SinkBehavior,
}

impl MemoryRenderer {
    /// Create a renderer that reports through `dispatcher`
    ///
    /// Appends stay in flight until [`MemoryHandle::complete_append`].
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            dispatcher,
            behavior: SinkBehavior {
                auto_complete: false,
                segment_duration: None,
            },
        }
    }

    /// Complete every append immediately
    pub fn auto_complete(mut self, enabled: bool) -> Self {
        self.behavior.auto_complete = enabled;
        self
    }

    /// Grow each sink's buffered range by `seconds` per media append
    pub fn simulate_segment_duration(mut self, seconds: f64) -> Self {
        self.behavior.segment_duration = Some(seconds);
        self
    }

    /// Get a handle for inspecting and driving this renderer
    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            state: Arc::clone(&self.state),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl MediaRenderer for MemoryRenderer {
    fn open_source(&mut self) -> Result<(), RenderError> {
        {
            let mut state = self.state.lock();
            state.sources_opened += 1;
            state.position = 0.0;
            state.ended = false;
        }
        self.dispatcher.dispatch(RendererEvent::SourceOpen);
        Ok(())
    }

    fn add_track_sink(
        &mut self,
        track_id: TrackId,
        kind: TrackKind,
        mime_type: &str,
    ) -> Result<Box<dyn TrackSink>, RenderError> {
        let mut state = self.state.lock();
        if state.sources_opened == 0 {
            return Err(RenderError::SourceNotOpen);
        }
        state.sinks.push(SinkRecord {
            track_id,
            kind,
            mime_type: mime_type.to_string(),
            sequence_mode: false,
            appended: Vec::new(),
            updating: false,
            buffered_end: None,
            aborted: 0,
            busy_appends: 0,
            detached: false,
        });
        Ok(Box::new(MemorySink {
            index: state.sinks.len() - 1,
            track_id,
            state: Arc::clone(&self.state),
            dispatcher: self.dispatcher.clone(),
            behavior: self.behavior,
        }))
    }

    fn end_of_stream(&mut self) {
        self.state.lock().ended = true;
    }

    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn set_position(&mut self, position: f64) {
        self.state.lock().position = position;
    }

    fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_rate(&mut self, rate: f64) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.rate != rate;
            state.rate = rate;
            changed
        };
        if changed {
            self.dispatcher.dispatch(RendererEvent::RateChange(rate));
        }
    }

    fn play(&mut self) {
        let started = !std::mem::replace(&mut self.state.lock().playing, true);
        if started {
            self.dispatcher.dispatch(RendererEvent::Play);
        }
    }

    fn pause(&mut self) {
        let stopped = std::mem::replace(&mut self.state.lock().playing, false);
        if stopped {
            self.dispatcher.dispatch(RendererEvent::Pause);
        }
    }
}

struct MemorySink {
    index: usize,
    track_id: TrackId,
    state: Arc<Mutex<MemoryState>>,
    dispatcher: Dispatcher,
    behavior: SinkBehavior,
}

impl TrackSink for MemorySink {
    fn track_id(&self) -> TrackId {
        self.track_id
    }

    fn set_sequence_mode(&mut self) {
        self.state.lock().sinks[self.index].sequence_mode = true;
    }

    fn append(&mut self, data: Bytes) -> Result<(), RenderError> {
        {
            let mut state = self.state.lock();
            let record = &mut state.sinks[self.index];
            if record.detached {
                return Err(RenderError::Detached {
                    track_id: self.track_id,
                });
            }
            if record.updating {
                record.busy_appends += 1;
                return Err(RenderError::SinkBusy {
                    track_id: self.track_id,
                });
            }
            // First append is the init segment and carries no media time
            if let (Some(duration), false) =
                (self.behavior.segment_duration, record.appended.is_empty())
            {
                record.buffered_end = Some(record.buffered_end.unwrap_or(0.0) + duration);
            }
            record.appended.push(data);
            record.updating = !self.behavior.auto_complete;
        }
        if self.behavior.auto_complete {
            self.dispatcher.dispatch(RendererEvent::AppendComplete {
                track_id: self.track_id,
            });
        }
        Ok(())
    }

    fn is_updating(&self) -> bool {
        self.state.lock().sinks[self.index].updating
    }

    fn abort(&mut self) {
        let mut state = self.state.lock();
        let record = &mut state.sinks[self.index];
        if record.updating {
            record.updating = false;
            record.aborted += 1;
        }
    }

    fn buffered_end(&self) -> Option<f64> {
        self.state.lock().sinks[self.index].buffered_end
    }

    fn detach(&mut self) {
        self.state.lock().sinks[self.index].detached = true;
    }
}

/// Inspection and control handle for a [`MemoryRenderer`]
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
    dispatcher: Dispatcher,
}

impl MemoryHandle {
    /// Finish the in-flight append of the live sink for `track_id`
    ///
    /// Returns `false` if that sink had nothing in flight.
    pub fn complete_append(&self, track_id: TrackId) -> bool {
        {
            let mut state = self.state.lock();
            let Some(record) = live_sink_mut(&mut state, track_id) else {
                return false;
            };
            if !record.updating {
                return false;
            }
            record.updating = false;
        }
        self.dispatcher
            .dispatch(RendererEvent::AppendComplete { track_id });
        true
    }

    /// Set the end of the live sink's buffered range
    pub fn set_buffered_end(&self, track_id: TrackId, end: Option<f64>) {
        let mut state = self.state.lock();
        if let Some(record) = live_sink_mut(&mut state, track_id) {
            record.buffered_end = end;
        }
    }

    /// Move the playback position as if playback advanced
    pub fn advance_to(&self, position: f64) {
        self.state.lock().position = position;
        self.dispatcher.dispatch(RendererEvent::TimeUpdate);
    }

    /// Record of the most recent non-detached sink for `track_id`
    pub fn sink(&self, track_id: TrackId) -> Option<SinkRecord> {
        let state = self.state.lock();
        state
            .sinks
            .iter()
            .rev()
            .find(|record| record.track_id == track_id && !record.detached)
            .cloned()
    }

    /// Records of every sink ever created, oldest first
    pub fn sinks(&self) -> Vec<SinkRecord> {
        self.state.lock().sinks.clone()
    }

    /// Local playback position
    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    /// Playback rate
    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Number of media sources opened so far
    pub fn sources_opened(&self) -> u32 {
        self.state.lock().sources_opened
    }

    /// Whether end-of-stream was signalled
    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }
}

fn live_sink_mut(state: &mut MemoryState, track_id: TrackId) -> Option<&mut SinkRecord> {
    state
        .sinks
        .iter_mut()
        .rev()
        .find(|record| record.track_id == track_id && !record.detached)
}
