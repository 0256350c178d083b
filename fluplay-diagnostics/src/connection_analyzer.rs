//! Reconnect loop analysis
//!
//! Reconnecting on every close while playing is unbounded by default. A
//! server that accepts and then immediately drops the socket turns that into
//! a tight loop, which is easy to miss in the logs. The analyzer counts
//! attempts in a sliding window and flags the loop once.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default sliding window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Default number of attempts within the window that counts as a storm
pub const DEFAULT_THRESHOLD: usize = 5;

/// Snapshot of reconnect activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectReport {
    /// Attempts since the analyzer was created
    pub total: u64,
    /// Attempts inside the current window
    pub recent: usize,
    /// Whether the recent rate is above the threshold
    pub storm: bool,
}

/// Sliding-window reconnect counter
#[derive(Debug, Clone)]
pub struct ReconnectAnalyzer {
    window: Duration,
    threshold: usize,
    attempts: VecDeque<Instant>,
    total: u64,
    storm: bool,
}

impl ReconnectAnalyzer {
    /// Create an analyzer flagging `threshold` attempts within `window`
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            window,
            threshold: threshold.max(1),
            attempts: VecDeque::new(),
            total: 0,
            storm: false,
        }
    }

    /// Record an attempt made at `now`
    ///
    /// Returns `true` only for the attempt that starts a storm.
    pub fn record(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.attempts.push_back(now);
        self.total += 1;

        let storm = self.attempts.len() >= self.threshold;
        let started = storm && !self.storm;
        self.storm = storm;
        if started {
            warn!(
                "reconnect storm: {} attempts within {:?}",
                self.attempts.len(),
                self.window
            );
        }
        started
    }

    /// Whether the attempts inside the window at `now` still form a storm
    pub fn is_storm(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.storm = self.attempts.len() >= self.threshold;
        self.storm
    }

    /// Current activity as of `now`
    pub fn report(&mut self, now: Instant) -> ReconnectReport {
        let storm = self.is_storm(now);
        ReconnectReport {
            total: self.total,
            recent: self.attempts.len(),
            storm,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.attempts.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            self.attempts.pop_front();
        }
    }
}

impl Default for ReconnectAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storm_flagged_once() {
        let mut analyzer = ReconnectAnalyzer::new(Duration::from_secs(10), 3);
        let start = Instant::now();

        assert!(!analyzer.record(start));
        assert!(!analyzer.record(start + Duration::from_secs(1)));
        assert!(analyzer.record(start + Duration::from_secs(2)));
        assert!(!analyzer.record(start + Duration::from_secs(3)));
        assert!(analyzer.is_storm(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_window_slides() {
        let mut analyzer = ReconnectAnalyzer::new(Duration::from_secs(10), 3);
        let start = Instant::now();

        for secs in [0, 1, 2] {
            analyzer.record(start + Duration::from_secs(secs));
        }
        assert!(analyzer.is_storm(start + Duration::from_secs(5)));

        let report = analyzer.report(start + Duration::from_secs(11));
        assert_eq!(
            report,
            ReconnectReport {
                total: 3,
                recent: 1,
                storm: false
            }
        );

        // a new storm after calming down is reported again
        assert!(!analyzer.record(start + Duration::from_secs(12)));
        assert!(!analyzer.record(start + Duration::from_secs(13)));
        assert!(analyzer.record(start + Duration::from_secs(14)));
    }

    #[test]
    fn test_report_serializes() {
        let report = ReconnectAnalyzer::default().report(Instant::now());
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"total":0,"recent":0,"storm":false}"#);
    }
}
