//! Error types for fluplay

use thiserror::Error;

/// Main error type for fluplay operations
#[derive(Error, Debug)]
pub enum FluError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Offending configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Transport error
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// Command could not be sent because the connection is not open
    #[error("Connection not open, command dropped: {command}")]
    NotConnected {
        /// Command that was dropped
        command: String,
    },

    /// Binary segment shorter than the fixed header layout
    #[error("Invalid segment: expected at least {expected} bytes, got {actual}")]
    SegmentTooShort {
        /// Minimum segment size
        expected: usize,
        /// Actual segment size
        actual: usize,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Control message with a type tag this player does not handle
    #[error("Unhandled message type: {message_type}")]
    UnhandledMessageType {
        /// Value of the `type` field
        message_type: String,
    },

    /// Initialization payload could not be decoded
    #[error("Failed to decode init payload for track {track_id}: {reason}")]
    PayloadDecode {
        /// Track the payload belongs to
        track_id: u8,
        /// Decoder error
        reason: String,
    },

    /// Track content tag not recognised
    #[error("Unsupported track content: {content}")]
    UnsupportedTrackContent {
        /// Content tag from the init message
        content: String,
    },

    /// Renderer rejected an operation
    #[error("Render error: {reason}")]
    Render {
        /// Reason reported by the renderer
        reason: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },
}

impl FluError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            FluError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            FluError::MissingConfiguration { .. } => "MISSING_CONFIGURATION".to_string(),
            FluError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            FluError::Transport { .. } => "TRANSPORT_ERROR".to_string(),
            FluError::NotConnected { .. } => "NOT_CONNECTED".to_string(),
            FluError::SegmentTooShort { .. } => "SEGMENT_TOO_SHORT".to_string(),
            FluError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
            FluError::UnhandledMessageType { .. } => "UNHANDLED_MESSAGE_TYPE".to_string(),
            FluError::PayloadDecode { .. } => "PAYLOAD_DECODE_FAILED".to_string(),
            FluError::UnsupportedTrackContent { .. } => "UNSUPPORTED_TRACK_CONTENT".to_string(),
            FluError::Render { .. } => "RENDER_ERROR".to_string(),
            FluError::InvalidState { .. } => "INVALID_STATE".to_string(),
        }
    }

    /// Whether the condition is expected to clear up on its own
    ///
    /// Transport failures recover through the reconnect path. A command
    /// dropped while disconnected is lost; the next open only sends `resume`.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FluError::Transport { .. } | FluError::NotConnected { .. }
        )
    }
}
