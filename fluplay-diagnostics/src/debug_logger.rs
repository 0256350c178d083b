//! Structured debug logging system

use fluplay_core::FluError;
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Debug logger for structured logging
#[derive(Debug, Clone)]
pub struct DebugLogger {
    filter: String,
}

impl DebugLogger {
    /// Create new debug logger
    pub fn new() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
        }
    }

    /// Use `directive` when `RUST_LOG` is not set
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = directive.into();
        self
    }

    /// Filter directive used without `RUST_LOG`
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Install the global fmt subscriber
    ///
    /// Fails if the directive does not parse or a global subscriber is
    /// already installed.
    pub fn init(&self) -> Result<(), FluError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.filter).map_err(|e| {
                FluError::InvalidConfiguration {
                    field: "log filter".to_string(),
                    reason: e.to_string(),
                }
            })?,
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| FluError::Initialization {
                reason: format!("logging: {}", e),
            })
    }

    /// Initialize logging system with the default filter
    pub fn init_logging() -> Result<(), FluError> {
        Self::new().init()
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(DebugLogger::default().filter(), "info");
        assert_eq!(
            DebugLogger::new().with_filter("fluplay=debug").filter(),
            "fluplay=debug"
        );
    }

    #[test]
    fn test_second_init_fails() {
        let _ = DebugLogger::init_logging();
        let err = DebugLogger::init_logging().unwrap_err();
        assert_eq!(err.error_code(), "INITIALIZATION_FAILED");
    }
}
