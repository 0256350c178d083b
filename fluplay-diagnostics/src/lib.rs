//! # fluplay Diagnostics
//!
//! Debugging and diagnostic tools for fluplay.
//! Provides structured logging setup and reconnect loop analysis.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod connection_analyzer;
pub mod debug_logger;

// Re-export main types
pub use connection_analyzer::{ReconnectAnalyzer, ReconnectReport};
pub use debug_logger::DebugLogger;
