//! Pure retry decisions for reconnect episodes.

use std::time::Duration;

use crate::error::Error;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Outcome of consulting the policy after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then attempt again.
    Retry { delay: Duration },
    /// Budget exhausted or failure is permanent; surface the error.
    GiveUp,
}

/// Decides whether a failed attempt is worth repeating, and how long to
/// wait first.
///
/// A pure function of `(attempts_made, failure)`: no clocks, no state. Only
/// transient failures are retried; the delay doubles per attempt from
/// `base_delay` up to `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Overrides the backoff window. Mostly useful to keep tests fast.
    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempts_made` is the number of reconnect attempts already consumed
    /// in this episode (0 before the first).
    pub fn decide(&self, attempts_made: u32, failure: &Error) -> RetryDecision {
        if !failure.is_transient() || attempts_made >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.delay_for(attempts_made),
        }
    }

    fn delay_for(&self, attempts_made: u32) -> Duration {
        let factor = 1u32 << attempts_made.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
