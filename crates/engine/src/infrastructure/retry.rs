//! Exponential backoff with jitter for transient chat-backend failures.

use std::time::Duration;

use rand::Rng;

/// Configuration for retry behavior on 429/5xx/transport errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay in milliseconds before the second attempt; doubles per attempt.
    pub base_delay_ms: u64,
    /// Additive jitter fraction (0.0-1.0) applied on top of the delay.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter_range = (exponential as f64 * self.jitter_factor) as u64;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range)
        } else {
            0
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 500,
            jitter_factor: 0.0,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1000,
            jitter_factor: 0.25,
        };
        for _ in 0..100 {
            let delay = policy.delay_after(1).as_millis() as u64;
            assert!((1000..=1250).contains(&delay));
        }
    }
}
