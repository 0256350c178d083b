//! Configuration types and defaults

use fluplay_core::FluError;
use fluplay_signaling::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seconds rewound when playback resumes on an already open connection
///
/// The server does not return the exact position requested, so resuming
/// exactly at the cursor would leave a gap.
pub const DEFAULT_RESUME_REWIND: f64 = 4.0;

/// Buffer-depth flow control thresholds, all in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Interval between flow checks
    pub period: Duration,
    /// Pause delivery above this buffered depth
    pub high_watermark: f64,
    /// Resume delivery below this buffered depth
    pub low_watermark: f64,
    /// How far behind the cursor a resume re-seeks
    pub reseek_rewind: f64,
    /// Live lag that triggers a jump towards the buffered end
    pub live_max_lag: f64,
    /// Lag left behind the buffered end after a jump
    pub live_target_lag: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            high_watermark: 10.0,
            low_watermark: 5.0,
            reseek_rewind: 6.0,
            live_max_lag: 1.5,
            live_target_lag: 0.5,
        }
    }
}

impl FlowConfig {
    /// Check the thresholds are consistent
    pub fn validate(&self) -> Result<(), FluError> {
        if self.period.is_zero() {
            return Err(invalid("flow.period", "must be greater than zero"));
        }
        let values = [
            ("flow.high_watermark", self.high_watermark),
            ("flow.low_watermark", self.low_watermark),
            ("flow.reseek_rewind", self.reseek_rewind),
            ("flow.live_max_lag", self.live_max_lag),
            ("flow.live_target_lag", self.live_target_lag),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, "must be a finite, non-negative number"));
            }
        }
        if self.low_watermark >= self.high_watermark {
            return Err(invalid(
                "flow.low_watermark",
                "must be below flow.high_watermark",
            ));
        }
        if self.live_target_lag >= self.live_max_lag {
            return Err(invalid(
                "flow.live_target_lag",
                "must be below flow.live_max_lag",
            ));
        }
        Ok(())
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// WebSocket URL of the stream
    pub url: String,
    /// Initial real-time cursor, seconds since the Unix epoch
    pub start_time: f64,
    /// Label of the video track, for logs
    pub video_track: Option<String>,
    /// Label of the audio track, for logs
    pub audio_track: Option<String>,
    /// Flow control thresholds
    pub flow: FlowConfig,
    /// What to do when the socket drops during playback
    pub reconnect: ReconnectPolicy,
    /// Seconds rewound when resuming on an open connection
    pub resume_rewind: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            start_time: 0.0,
            video_track: None,
            audio_track: None,
            flow: FlowConfig::default(),
            reconnect: ReconnectPolicy::default(),
            resume_rewind: DEFAULT_RESUME_REWIND,
        }
    }
}

impl PlayerConfig {
    /// Create a configuration for `url` with defaults for everything else
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), FluError> {
        if self.url.trim().is_empty() {
            return Err(FluError::MissingConfiguration {
                field: "url".to_string(),
            });
        }
        if !self.start_time.is_finite() {
            return Err(invalid("start_time", "must be finite"));
        }
        if !self.resume_rewind.is_finite() || self.resume_rewind < 0.0 {
            return Err(invalid(
                "resume_rewind",
                "must be a finite, non-negative number",
            ));
        }
        let reconnect = &self.reconnect;
        if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
            return Err(invalid("reconnect.multiplier", "must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&reconnect.jitter) {
            return Err(invalid("reconnect.jitter", "must be between 0.0 and 1.0"));
        }
        self.flow.validate()
    }
}

fn invalid(field: &str, reason: &str) -> FluError {
    FluError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let flow = FlowConfig::default();
        assert_eq!(flow.period, Duration::from_secs(1));
        assert_eq!(flow.high_watermark, 10.0);
        assert_eq!(flow.low_watermark, 5.0);
        assert_eq!(flow.reseek_rewind, 6.0);
        assert_eq!(flow.live_max_lag, 1.5);
        assert_eq!(flow.live_target_lag, 0.5);
        assert!(flow.validate().is_ok());

        let config = PlayerConfig::default();
        assert_eq!(config.resume_rewind, 4.0);
        assert_eq!(config.reconnect, ReconnectPolicy::immediate());
    }

    #[test]
    fn test_missing_url() {
        let err = PlayerConfig::default().validate().unwrap_err();
        assert_eq!(err.error_code(), "MISSING_CONFIGURATION");
        assert!(PlayerConfig::new("ws://localhost/cam/mse_ld").validate().is_ok());
    }

    #[test]
    fn test_inverted_watermarks_rejected() {
        let mut config = PlayerConfig::new("ws://localhost/cam/mse_ld");
        config.flow.low_watermark = 12.0;
        match config.validate().unwrap_err() {
            FluError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "flow.low_watermark")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PlayerConfig = serde_json::from_str(
            r#"{"url":"ws://localhost/cam/mse_ld","start_time":1700000000.0,"flow":{"high_watermark":20.0}}"#,
        )
        .unwrap();
        assert_eq!(config.start_time, 1700000000.0);
        assert_eq!(config.flow.high_watermark, 20.0);
        assert_eq!(config.flow.low_watermark, 5.0);
        assert_eq!(config.resume_rewind, 4.0);
        assert!(config.validate().is_ok());
    }
}
