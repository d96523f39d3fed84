//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// Reconnection backoff: doubles from `initial` up to `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    /// Failed attempts in a row before giving up; 0 retries forever
    pub max_attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            max_attempts: 0,
        }
    }

    pub fn attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn next(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.max)
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts > 0 && attempts >= self.max_attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Ping cadence, and how long an unanswered ping may stay outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub backoff: Backoff,
    pub keepalive: Keepalive,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: Backoff::default(),
            keepalive: Keepalive::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Events delivered to the consumer of a connection
#[derive(Debug, Clone)]
pub enum WsMessage {
    Text(String),
    Connected,
    /// Connection loop ended; no further messages follow
    Disconnected,
    /// Waiting before the given reconnection attempt
    Reconnecting { attempt: u32 },
}

#[derive(Debug, Clone, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// An established stream broke or was closed by the server
    #[error("Stream failed: {0}")]
    StreamFailed(String),
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    #[error("Send failed: {0}")]
    SendFailed(String),
}
