//! Control protocol messages
//!
//! Outbound commands are bare strings. Inbound control messages are JSON
//! objects tagged by a `type` field; everything else on the socket is a
//! binary media segment.

use base64::Engine;
use bytes::Bytes;
use fluplay_core::{FluError, TrackId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted wherever a seek target is parsed
pub const LIVE_SENTINEL: &str = "live";

/// Commands sent to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Resume pushing segments
    Resume,
    /// Stop pushing segments
    Pause,
    /// Jump to the live edge
    Live,
    /// Restart delivery from a real-time position (whole seconds)
    PlayFrom(i64),
}

impl Command {
    /// `play_from` for a fractional time, rounded half-up
    pub fn play_from(utc: f64) -> Self {
        Command::PlayFrom((utc + 0.5).floor() as i64)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Resume => f.write_str("resume"),
            Command::Pause => f.write_str("pause"),
            Command::Live => f.write_str("live"),
            Command::PlayFrom(utc) => write!(f, "play_from={}", utc),
        }
    }
}

/// Where a seek should land
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekTarget {
    /// Follow the live edge
    Live,
    /// Real time in seconds since the Unix epoch
    At(f64),
}

impl fmt::Display for SeekTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekTarget::Live => f.write_str(LIVE_SENTINEL),
            SeekTarget::At(utc) => write!(f, "{}", utc),
        }
    }
}

impl FromStr for SeekTarget {
    type Err = FluError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(LIVE_SENTINEL) {
            return Ok(SeekTarget::Live);
        }
        s.parse::<f64>()
            .ok()
            .filter(|utc| utc.is_finite())
            .map(SeekTarget::At)
            .ok_or_else(|| FluError::InvalidConfiguration {
                field: "seek target".to_string(),
                reason: format!("expected \"live\" or seconds, got {:?}", s),
            })
    }
}

impl From<f64> for SeekTarget {
    fn from(utc: f64) -> Self {
        SeekTarget::At(utc)
    }
}

/// Per-track entry of the init message metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Content tag (`video` / `audio`)
    pub content: String,
    /// Fields this player does not interpret (bitrate, dimensions, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Metadata block of the init message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InitMetadata {
    /// Declared tracks, in the order sinks are created
    #[serde(default)]
    pub tracks: Vec<TrackMetadata>,
}

/// Initialization payload for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitTrack {
    /// Track id segments will carry
    pub id: TrackId,
    /// Content tag (`video` / `audio`)
    pub content: String,
    /// Base64 initialization segment
    pub payload: String,
}

impl InitTrack {
    /// Decode the base64 payload
    pub fn decode_payload(&self) -> Result<Bytes, FluError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload.as_bytes())
            .map(Bytes::from)
            .map_err(|e| FluError::PayloadDecode {
                track_id: self.id,
                reason: e.to_string(),
            })
    }
}

/// Body of an `mse_init_segment` message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InitSegment {
    /// Track declarations
    #[serde(default)]
    pub metadata: InitMetadata,
    /// Track payloads
    #[serde(default)]
    pub tracks: Vec<InitTrack>,
}

impl InitSegment {
    /// First payload entry with the given content tag
    pub fn track_for(&self, content: &str) -> Option<&InitTrack> {
        self.tracks.iter().find(|track| track.content == content)
    }
}

/// Inbound JSON control message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Acknowledgement of the last command; the payload is opaque
    Event(Value),
    /// Stream (re)initialization
    InitSegment(InitSegment),
}

impl ServerMessage {
    /// Parse a text frame
    ///
    /// Malformed JSON yields `InvalidMessage`; a well-formed message with an
    /// unknown or missing `type` yields `UnhandledMessageType`.
    pub fn parse(text: &str) -> Result<Self, FluError> {
        let value: Value = serde_json::from_str(text).map_err(|e| invalid(text, e))?;
        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match message_type.as_str() {
            "event" => Ok(ServerMessage::Event(
                value.get("event").cloned().unwrap_or(Value::Null),
            )),
            "mse_init_segment" => serde_json::from_value(value)
                .map(ServerMessage::InitSegment)
                .map_err(|e| invalid(text, e)),
            _ => Err(FluError::UnhandledMessageType { message_type }),
        }
    }
}

fn invalid(text: &str, e: serde_json::Error) -> FluError {
    FluError::InvalidMessage {
        message: text.to_string(),
        source: e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_strings() {
        assert_eq!(Command::Resume.to_string(), "resume");
        assert_eq!(Command::Pause.to_string(), "pause");
        assert_eq!(Command::Live.to_string(), "live");
        assert_eq!(Command::PlayFrom(1700000000).to_string(), "play_from=1700000000");
    }

    #[test]
    fn test_play_from_rounds_half_up() {
        assert_eq!(Command::play_from(100.4), Command::PlayFrom(100));
        assert_eq!(Command::play_from(100.5), Command::PlayFrom(101));
        assert_eq!(Command::play_from(-2.5), Command::PlayFrom(-2));
    }

    #[test]
    fn test_seek_target_parse() {
        assert_eq!("live".parse::<SeekTarget>().unwrap(), SeekTarget::Live);
        assert_eq!("LIVE".parse::<SeekTarget>().unwrap(), SeekTarget::Live);
        assert_eq!(
            "1700000000.5".parse::<SeekTarget>().unwrap(),
            SeekTarget::At(1700000000.5)
        );
        assert!("yesterday".parse::<SeekTarget>().is_err());
        assert!("NaN".parse::<SeekTarget>().is_err());
    }
}
