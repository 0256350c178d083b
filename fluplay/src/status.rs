//! Playback status snapshot and session counters

use chrono::{DateTime, Utc};
use fluplay_signaling::ConnectionState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters kept over the lifetime of a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStats {
    /// Segments queued for a sink
    pub segments_accepted: u64,
    /// Segments not newer than the cursor
    pub segments_stale: u64,
    /// Segments for a track without a sink
    pub segments_unknown_track: u64,
    /// Segments arriving while a command awaited its acknowledgement
    pub segments_awaiting_ack: u64,
    /// Frames too short to carry a segment header
    pub segments_malformed: u64,
    /// Segments the sink refused
    pub segments_rejected: u64,
    /// Commands written to the socket
    pub commands_sent: u64,
    /// Commands dropped because the socket was not open
    pub commands_dropped: u64,
    /// Replacement sockets opened after an unplanned close
    pub reconnects: u64,
}

/// Point-in-time view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    /// Player session id
    pub session_id: Uuid,
    /// Stream URL
    pub url: String,
    /// Current real time, once the clock is anchored
    pub time: Option<f64>,
    /// `time` as a UTC date
    pub utc: Option<DateTime<Utc>>,
    /// Real-time cursor used to filter stale segments
    pub cursor: f64,
    /// Playback rate
    pub rate: f64,
    /// Following the live edge
    pub live: bool,
    /// Playback paused
    pub paused: bool,
    /// Server is pushing segments
    pub loading: bool,
    /// No command awaits an acknowledgement
    pub waiting_data: bool,
    /// Next video segment re-anchors the clock
    pub awaiting_start: bool,
    /// Socket lifecycle
    pub connection: ConnectionState,
    /// Registered tracks
    pub tracks: usize,
    /// Session counters
    pub stats: PlaybackStats,
    /// Player has been stopped
    pub stopped: bool,
}
