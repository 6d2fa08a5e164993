//! Exponential-backoff delays for hub reconnection.
//!
//! Attempt `n` (starting at 1) waits `min(base * 2^n, max_delay)` plus a
//! uniformly random jitter in `[0, max_jitter]`, so concurrent clients
//! that lost the hub together do not reconnect in lockstep.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Unit multiplied by `2^attempt`.
    pub base: Duration,
    /// Upper bound on the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound on the random jitter added on top.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_jitter: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// The deterministic part of the delay for `attempt`, clamped to
    /// [`max_delay`](Self::max_delay).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Full delay for `attempt` with an explicit jitter, which is clamped
    /// to [`max_jitter`](Self::max_jitter).
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        self.base_delay(attempt) + jitter.min(self.max_jitter)
    }

    /// Full delay for `attempt` with a random jitter.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let max_jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter_ms = if max_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=max_jitter_ms)
        };
        self.delay_with_jitter(attempt, Duration::from_millis(jitter_ms))
    }
}
