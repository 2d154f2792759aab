//! Reconnect backoff policy

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for automatic reconnection
///
/// Delay for attempt `n` is `min(base_delay * 2^(n-1) + jitter, max_delay)`
/// with jitter drawn uniformly from `[0, jitter_max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry (pre-jitter)
    pub base_delay: Duration,
    /// Ceiling on any computed delay
    pub max_delay: Duration,
    /// Retries allowed before the policy is exhausted
    pub max_attempts: u32,
    /// Upper bound on the random jitter added to each delay
    pub jitter_max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
            jitter_max: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    /// Whether the policy allows no further automatic attempts
    #[must_use]
    pub fn is_exhausted(&self, attempt_count: u32) -> bool {
        attempt_count >= self.max_attempts
    }

    /// Delay before reconnect attempt `n` (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Exponent clamp keeps the multiplication from overflowing long
        // before max_delay caps it anyway.
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(2_u32.saturating_pow(exponent));

        let jitter_ms = self.jitter_max.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };

        backoff.saturating_add(jitter).min(self.max_delay)
    }
}
