//! Idle budget accounting.

use std::time::{Duration, Instant};

/// Decides when a session has been idle long enough to release the link.
///
/// Evaluation is cooperative: callers check at the boundaries between
/// operations, never mid-flight.
#[derive(Debug, Clone)]
pub struct IdleExpiry {
    budget: Duration,
}

impl IdleExpiry {
    /// A zero budget disables expiry entirely.
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns true if a session last active at `last_activity_at` has
    /// exhausted its idle budget.
    pub fn expired(&self, last_activity_at: Option<Instant>) -> bool {
        if self.budget.is_zero() {
            return false;
        }
        match last_activity_at {
            Some(at) => at.elapsed() >= self.budget,
            None => false,
        }
    }

    /// How often a background sweeper should re-check, bounded so short
    /// test budgets still sweep promptly and long production budgets do not
    /// spin.
    pub fn sweep_interval(&self) -> Duration {
        (self.budget / 4)
            .max(Duration::from_millis(10))
            .min(Duration::from_secs(30))
    }
}
