//! Caller-side retry policies.
//!
//! Nothing in the lock manager or the queue retries on its own; a caller that
//! prefers waiting over failing fast opts in by passing a policy.

use concord_core::ConcordError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry strategy enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// No retry.
    None,
    /// Fixed delay between retries.
    Fixed,
    /// Exponential backoff with optional jitter.
    Exponential,
    /// Linear backoff.
    Linear,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retry strategy.
    pub strategy: RetryStrategy,

    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,

    /// Backoff multiplier (for exponential).
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0); zero disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5)
    }
}

impl RetryPolicy {
    /// Creates a policy with no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            strategy: RetryStrategy::None,
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Creates a fixed delay retry policy.
    #[must_use]
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        let delay_ms = millis(delay);
        Self {
            strategy: RetryStrategy::Fixed,
            max_retries,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Creates an exponential backoff policy starting at 100ms, capped at 5s.
    #[must_use]
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            max_retries,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    /// Creates a linear backoff retry policy.
    #[must_use]
    pub fn linear(max_retries: u32, increment: Duration) -> Self {
        let increment_ms = millis(increment);
        Self {
            strategy: RetryStrategy::Linear,
            max_retries,
            initial_delay_ms: increment_ms,
            max_delay_ms: increment_ms.saturating_mul(u64::from(max_retries)),
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = millis(delay);
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = millis(delay);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enables jitter.
    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Disables jitter.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Returns true if retry number `retry` (1-based) is allowed.
    #[must_use]
    pub fn should_retry(&self, retry: u32) -> bool {
        self.strategy != RetryStrategy::None && retry >= 1 && retry <= self.max_retries
    }

    /// Returns true if retry number `retry` is allowed after `error`.
    ///
    /// Only transient outcomes are retried: contention, lost optimistic races,
    /// and store outages.
    #[must_use]
    pub fn should_retry_error(&self, retry: u32, error: &ConcordError) -> bool {
        error.is_retriable() && self.should_retry(retry)
    }

    /// Delay to wait before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 || self.strategy == RetryStrategy::None {
            return Duration::ZERO;
        }

        let base_delay = match self.strategy {
            RetryStrategy::None => 0,
            RetryStrategy::Fixed => self.initial_delay_ms,
            RetryStrategy::Exponential => {
                let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
                let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
                if delay.is_finite() && delay < u64::MAX as f64 {
                    delay as u64
                } else {
                    u64::MAX
                }
            }
            RetryStrategy::Linear => self.initial_delay_ms.saturating_mul(u64::from(retry)),
        };

        let capped = base_delay.min(self.max_delay_ms);

        let delay = if self.jitter_factor > 0.0 {
            let range = (capped as f64 * self.jitter_factor) as u64;
            capped
                .saturating_add(jitter(range))
                .saturating_sub(range / 2)
        } else {
            capped
        };

        Duration::from_millis(delay)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Pseudo-random value in `0..range`, seeded from the clock.
///
/// Only spreads competing workers apart; not suitable for anything else.
fn jitter(range: u64) -> u64 {
    use std::time::SystemTime;

    if range == 0 {
        return 0;
    }

    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    // splitmix64 finalizer
    let mut z = u64::from(seed).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (z ^ (z >> 31)) % range
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn test_fixed_retry() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(50));

        assert!(!policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(50));
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::exponential(3).without_jitter();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(10));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(30));
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::exponential(100)
            .with_max_delay(Duration::from_secs(1))
            .without_jitter();

        assert_eq!(policy.delay_for_attempt(80), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_within_range() {
        let policy = RetryPolicy::fixed(1, Duration::from_millis(1000)).with_jitter(0.2);
        let delay = policy.delay_for_attempt(1);
        assert!(delay >= Duration::from_millis(900) && delay <= Duration::from_millis(1100));
    }

    #[test]
    fn test_only_transient_errors_are_retried() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);
        assert!(policy.should_retry_error(1, &ConcordError::lock_contention("job")));
        assert!(policy.should_retry_error(1, &ConcordError::StoreUnavailable("busy".into())));
        assert!(!policy.should_retry_error(1, &ConcordError::validation("bad")));
        assert!(!policy.should_retry_error(3, &ConcordError::lock_contention("job")));
    }
}
