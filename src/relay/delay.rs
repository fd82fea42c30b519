//! Delay budget: when a held response may be released.

use std::time::Duration;
use tokio::time::Instant;

/// The configured hold time, measured from the start of the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBudget {
    delay: Duration,
}

impl DelayBudget {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time still to wait after `elapsed` has already passed. Never negative.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.delay.saturating_sub(elapsed)
    }

    /// Earliest instant the response for an exchange started at `start` may go out.
    pub fn release_at(&self, start: Instant) -> Instant {
        start + self.delay
    }

    /// Suspend until the release instant.
    ///
    /// Returns at once when the upstream already used up the budget. The wait
    /// is a timer on the calling task; dropping the future cancels it.
    /// Returns how long the call actually waited for.
    pub async fn hold_until_release(&self, start: Instant) -> Duration {
        let remaining = self.remaining(start.elapsed());
        if remaining.is_zero() {
            return Duration::ZERO;
        }
        tokio::time::sleep_until(self.release_at(start)).await;
        remaining
    }
}
