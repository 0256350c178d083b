//! Binary media segment wire format
//!
//! Segments are fragmented MP4 chunks pushed by the server as single binary
//! frames. Only two facts are read from the container, both at fixed
//! offsets agreed with the producing server:
//!
//! - byte 47: track id
//! - bytes 92..96 and 96..100: big-endian `u32` seconds and microseconds of
//!   the segment's real-time timestamp
//!
//! There is no framing or versioning, so the length is checked before any
//! offset is read.

use crate::error::FluError;
use crate::event::TrackId;
use bytes::{Buf, Bytes};
use chrono::{DateTime, Utc};

/// Offset of the track id byte
pub const TRACK_ID_OFFSET: usize = 47;

/// Offset of the timestamp seconds field
pub const TIMESTAMP_SECONDS_OFFSET: usize = 92;

/// Offset of the timestamp microseconds field
pub const TIMESTAMP_MICROS_OFFSET: usize = 96;

/// Smallest frame that contains every field read here
pub const MIN_SEGMENT_LEN: usize = TIMESTAMP_MICROS_OFFSET + 4;

/// One media segment for a single track
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    track_id: TrackId,
    timestamp: f64,
    data: Bytes,
}

impl Segment {
    /// Parse a binary frame
    pub fn parse(data: Bytes) -> Result<Self, FluError> {
        if data.len() < MIN_SEGMENT_LEN {
            return Err(FluError::SegmentTooShort {
                expected: MIN_SEGMENT_LEN,
                actual: data.len(),
            });
        }

        let track_id = data[TRACK_ID_OFFSET];
        let mut header = &data[TIMESTAMP_SECONDS_OFFSET..MIN_SEGMENT_LEN];
        let seconds = header.get_u32();
        let micros = header.get_u32();
        let timestamp = seconds as f64 + micros as f64 / 1_000_000.0;

        Ok(Self {
            track_id,
            timestamp,
            data,
        })
    }

    /// Track the segment belongs to
    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    /// Real-time timestamp in seconds since the Unix epoch
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Timestamp as a calendar time, for logging
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        to_utc(self.timestamp)
    }

    /// Raw segment bytes as received
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Take the raw bytes
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// Convert fractional Unix seconds into a calendar time
pub fn to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
