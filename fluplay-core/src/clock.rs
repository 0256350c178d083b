//! Mapping between the renderer's local clock and real (UTC) time
//!
//! The renderer counts its position from zero every time a new media source
//! is opened, while segments carry absolute timestamps. The clock keeps the
//! offset between the two, captured from the first video segment after each
//! restart, plus the real-time cursor used to reject stale segments.

/// Real-time cursor and renderer-to-UTC offset
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    cursor: f64,
    time_shift: Option<f64>,
    awaiting_start: bool,
}

impl PlaybackClock {
    /// Create a clock positioned at `start` seconds of real time
    pub fn new(start: f64) -> Self {
        Self {
            cursor: start,
            time_shift: None,
            awaiting_start: true,
        }
    }

    /// Timestamp of the newest accepted video segment (or seek target)
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Reposition the cursor, e.g. for an explicit seek
    pub fn set_cursor(&mut self, time: f64) {
        self.cursor = time;
    }

    /// Move the cursor forward; never moves it back
    pub fn advance(&mut self, time: f64) {
        if time > self.cursor {
            self.cursor = time;
        }
    }

    /// Expect a fresh segment sequence; the next video segment re-anchors
    pub fn await_start(&mut self) {
        self.awaiting_start = true;
    }

    /// Whether the next video segment will re-anchor the offset
    pub fn is_awaiting_start(&self) -> bool {
        self.awaiting_start
    }

    /// Capture `segment_time - local_position` if a fresh sequence is expected
    ///
    /// Returns `true` when the offset was (re)captured.
    pub fn anchor(&mut self, segment_time: f64, local_position: f64) -> bool {
        if !self.awaiting_start {
            return false;
        }
        self.awaiting_start = false;
        self.time_shift = Some(segment_time - local_position);
        true
    }

    /// Current offset between renderer time and real time
    pub fn time_shift(&self) -> Option<f64> {
        self.time_shift
    }

    /// Real time corresponding to a renderer-local position
    pub fn real_time(&self, local_position: f64) -> Option<f64> {
        self.time_shift.map(|shift| local_position + shift)
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}
