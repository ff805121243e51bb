//! Session manager tunables.

use std::time::Duration;

/// Timeouts and budgets for one managed session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Budget for one discovery + connect + login attempt.
    pub connect_timeout: Duration,
    /// Budget for one device operation over an open link.
    pub operation_timeout: Duration,
    /// Idle budget after which the link is released. Zero disables expiry.
    pub idle_timeout: Duration,
    /// Reconnect attempts allowed within one recovery episode.
    pub max_reconnect_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            operation_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(1800),
            max_reconnect_attempts: 5,
        }
    }
}
