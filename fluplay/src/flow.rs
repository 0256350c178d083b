//! Flow Controller: buffer-depth hysteresis and live catch-up
//!
//! Every tick compares the end of the buffered video range with the local
//! playback position. Delivery is paused above the high watermark and
//! re-requested below the low one; between the two nothing changes. While
//! live, playback jumps forward whenever it lags the buffered end by too
//! much.

use crate::config::FlowConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Threshold checks for one flow tick
#[derive(Debug, Clone, PartialEq)]
pub struct FlowController {
    config: FlowConfig,
}

impl FlowController {
    /// Create a controller with the given thresholds
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Buffered seconds ahead of the playback position
    pub fn depth(buffered_end: f64, position: f64) -> f64 {
        buffered_end - position
    }

    /// Delivery should pause
    pub fn should_pause(&self, depth: f64, loading: bool) -> bool {
        loading && depth > self.config.high_watermark
    }

    /// Delivery should restart
    pub fn should_resume(&self, depth: f64, loading: bool) -> bool {
        !loading && depth < self.config.low_watermark
    }

    /// Real time to re-seek to before resuming
    pub fn reseek_target(&self, cursor: f64) -> f64 {
        cursor - self.config.reseek_rewind
    }

    /// Position to jump to while live, if playback lags too far behind
    pub fn catch_up_target(&self, live: bool, buffered_end: f64, position: f64) -> Option<f64> {
        let lag = Self::depth(buffered_end, position);
        (live && lag > self.config.live_max_lag).then(|| buffered_end - self.config.live_target_lag)
    }
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

/// Fixed-period timer armed by acknowledgements and disarmed by commands
///
/// Restarting replaces the running schedule; ticks never stack.
#[derive(Debug, Clone)]
pub struct FlowTimer {
    period: Duration,
    next: Option<Instant>,
}

impl FlowTimer {
    /// Create a stopped timer
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// (Re)start so the first tick fires one period after `now`
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    /// Stop the timer
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Whether the timer is armed
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// When the next tick is due
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Consume a due tick, scheduling the following one
    ///
    /// Ticks missed while the caller was busy collapse into one.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next {
            Some(deadline) if deadline <= now => {
                let mut next = deadline + self.period;
                if next <= now {
                    next = now + self.period;
                }
                self.next = Some(next);
                true
            }
            _ => false,
        }
    }
}
