//! Connection Manager: socket lifecycle, reconnect policy, message demux

use crate::protocol::{Command, ServerMessage};
use crate::transport::{Connector, Transport};
use bytes::Bytes;
use fluplay_core::{ConnectionId, Dispatcher, FluError, WireMessage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle of the current socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No socket
    Closed,
    /// Socket requested, not yet open
    Connecting,
    /// Socket open, commands can be sent
    Open,
    /// Close requested, waiting for the close event
    Closing,
}

/// How to retry after the socket closes while playback is running
///
/// The default retries immediately and forever. Setting a delay, jitter or
/// attempt cap turns that into a bounded backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for the delay
    pub max_delay: Duration,
    /// Growth factor between consecutive retries
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.0 to 1.0)
    pub jitter: f64,
    /// Give up after this many consecutive failed attempts
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl ReconnectPolicy {
    /// Retry at once, without limit
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    /// Exponential backoff from `initial_delay` up to `max_delay`
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: None,
        }
    }

    /// Cap the number of consecutive attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether attempt number `attempt` (1-based) may run
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Delay before attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        let spread = self.jitter.clamp(0.0, 1.0);
        let factor = if spread > 0.0 {
            1.0 + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            1.0
        };
        Duration::from_secs_f64((base * factor).max(0.0))
    }
}

/// What happened after an unplanned close
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// A new socket was requested
    Reconnecting {
        /// Consecutive attempt number, starting at 1
        attempt: u32,
        /// Delay before the new socket dials
        delay: Duration,
        /// Id of the new socket
        id: ConnectionId,
    },
    /// The policy's attempt cap was reached
    GaveUp {
        /// Attempts made since the last successful open
        attempts: u32,
    },
}

/// Classified inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Binary media segment, not parsed yet
    Media(Bytes),
    /// JSON control message
    Server(ServerMessage),
}

impl Inbound {
    /// Split a frame into media vs. control
    pub fn classify(message: WireMessage) -> Result<Self, FluError> {
        match message {
            WireMessage::Binary(data) => Ok(Inbound::Media(data)),
            WireMessage::Text(text) => ServerMessage::parse(&text).map(Inbound::Server),
        }
    }
}

/// Owner of the current socket
pub struct Connection<C: Connector> {
    url: String,
    connector: C,
    dispatcher: Dispatcher,
    policy: ReconnectPolicy,
    state: ConnectionState,
    current: Option<ConnectionId>,
    next_id: ConnectionId,
    transport: Option<Box<dyn Transport>>,
    attempts: u32,
    reconnects: u64,
}

impl<C: Connector> Connection<C> {
    /// Create a closed connection manager
    pub fn new(url: String, connector: C, dispatcher: Dispatcher, policy: ReconnectPolicy) -> Self {
        Self {
            url,
            connector,
            dispatcher,
            policy,
            state: ConnectionState::Closed,
            current: None,
            next_id: 1,
            transport: None,
            attempts: 0,
            reconnects: 0,
        }
    }

    /// Stream URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the URL used by the next connect
    pub fn set_url(&mut self, url: String) {
        self.url = url;
    }

    /// Lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether commands can be sent
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Id of the current socket
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Reconnects requested over the lifetime of this manager
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Access the connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Whether an event from socket `id` concerns the current socket
    pub fn accepts(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    /// Open a socket unless one is already connecting or open
    ///
    /// A fresh connect starts a new reconnect budget.
    pub fn connect(&mut self) -> Result<ConnectionId, FluError> {
        match (self.state, self.current) {
            (ConnectionState::Connecting | ConnectionState::Open, Some(id)) => {
                debug!("socket {} already {:?}, connect ignored", id, self.state);
                Ok(id)
            }
            _ => {
                self.attempts = 0;
                self.open(Duration::ZERO)
            }
        }
    }

    fn open(&mut self, delay: Duration) -> Result<ConnectionId, FluError> {
        let id = self.next_id;
        self.next_id += 1;
        info!("opening web socket {}, URL: {}", id, self.url);

        let transport = self
            .connector
            .connect(id, &self.url, delay, self.dispatcher.clone())?;
        self.transport = Some(transport);
        self.current = Some(id);
        self.state = ConnectionState::Connecting;
        Ok(id)
    }

    /// Record that socket `id` opened; `false` if it is not the current one
    pub fn on_open(&mut self, id: ConnectionId) -> bool {
        if !self.accepts(id) {
            return false;
        }
        info!("web socket {} is open", id);
        self.state = ConnectionState::Open;
        self.attempts = 0;
        true
    }

    /// Record that socket `id` closed; `false` if it is not the current one
    pub fn on_close(&mut self, id: ConnectionId) -> bool {
        if !self.accepts(id) {
            return false;
        }
        info!("web socket {} is closed", id);
        self.state = ConnectionState::Closed;
        self.current = None;
        self.transport = None;
        true
    }

    /// Open a replacement socket according to the reconnect policy
    pub fn reconnect(&mut self) -> Result<ReconnectDecision, FluError> {
        let attempt = self.attempts + 1;
        if !self.policy.allows(attempt) {
            return Ok(ReconnectDecision::GaveUp {
                attempts: self.attempts,
            });
        }
        self.attempts = attempt;
        self.reconnects += 1;

        let delay = self.policy.delay_for_attempt(attempt);
        let id = self.open(delay)?;
        Ok(ReconnectDecision::Reconnecting { attempt, delay, id })
    }

    /// Send a command on the open socket
    pub fn send(&mut self, command: Command) -> Result<(), FluError> {
        match (&mut self.transport, self.state) {
            (Some(transport), ConnectionState::Open) => transport.send_text(&command.to_string()),
            _ => Err(FluError::NotConnected {
                command: command.to_string(),
            }),
        }
    }

    /// Ask the current socket to close; the close event follows
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            self.state = ConnectionState::Closing;
            transport.close();
        }
    }
}

impl<C: Connector> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_policy_has_no_delay_or_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(50), Duration::ZERO);
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn test_exponential_policy_grows_and_caps() {
        let mut policy =
            ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1));
        policy.jitter = 0.0;

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy =
            ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10));
        for _ in 0..100 {
            let delay = policy.delay_for_attempt(1).as_secs_f64();
            assert!((0.79..=1.21).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_attempt_cap() {
        let policy = ReconnectPolicy::immediate().with_max_attempts(3);
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
    }
}
