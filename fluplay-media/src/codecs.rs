//! Track content kinds and their container mime types

use fluplay_core::FluError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mime type announced for video tracks
pub const VIDEO_MIME_TYPE: &str = "video/mp4; codecs=\"avc1.4d401f\"";

/// Mime type announced for audio tracks
pub const AUDIO_MIME_TYPE: &str = "audio/mp4; codecs=\"mp4a.40.2\"";

/// Content carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// H.264 video
    Video,
    /// AAC audio
    Audio,
}

impl TrackKind {
    /// Mime type the renderer sink is created with
    pub fn mime_type(&self) -> &'static str {
        match self {
            TrackKind::Video => VIDEO_MIME_TYPE,
            TrackKind::Audio => AUDIO_MIME_TYPE,
        }
    }

    /// Content tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }

    /// Whether this is the video track
    pub fn is_video(&self) -> bool {
        matches!(self, TrackKind::Video)
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackKind {
    type Err = FluError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        match content {
            "video" => Ok(TrackKind::Video),
            "audio" => Ok(TrackKind::Audio),
            other => Err(FluError::UnsupportedTrackContent {
                content: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_tags() {
        assert_eq!("video".parse::<TrackKind>().unwrap(), TrackKind::Video);
        assert_eq!("audio".parse::<TrackKind>().unwrap(), TrackKind::Audio);
        assert!("subtitles".parse::<TrackKind>().is_err());
        assert_eq!(TrackKind::Audio.to_string(), "audio");
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(
            TrackKind::Video.mime_type(),
            "video/mp4; codecs=\"avc1.4d401f\""
        );
        assert_eq!(TrackKind::Audio.mime_type(), "audio/mp4; codecs=\"mp4a.40.2\"");
    }
}
