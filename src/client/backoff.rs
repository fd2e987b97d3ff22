//! Reconnect backoff schedule.
//!
//! Delays grow exponentially from a configured minimum to a configured
//! maximum, with up to 50% random jitter added so a fleet of clients does
//! not reconnect in lockstep after a server restart. The schedule resets
//! once a connection authenticates.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;

// ============================================================================
// BackoffConfig
// ============================================================================

/// Bounds of the reconnect delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Ceiling no delay ever exceeds.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Stateful delay generator for one reconnect cycle.
#[derive(Debug)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the delay to wait before the next attempt and advances the
    /// schedule.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let min_ms = self.config.min_delay.as_millis() as u64;
        let max_ms = self.config.max_delay.as_millis() as u64;

        let base = min_ms
            .saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX))
            .min(max_ms);
        self.attempt = self.attempt.saturating_add(1);

        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(base.saturating_add(jitter).min(max_ms))
    }

    /// Resets the schedule after a successful authentication.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_stay_within_bounds() {
        let config = BackoffConfig::default();
        let mut backoff = Backoff::new(config);

        for _ in 0..40 {
            let delay = backoff.next_delay();
            assert!(delay >= config.min_delay, "delay {delay:?} below minimum");
            assert!(delay <= config.max_delay, "delay {delay:?} above maximum");
        }
    }

    #[test]
    fn test_delays_grow_toward_maximum() {
        let config = BackoffConfig {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(3200),
        };
        let mut backoff = Backoff::new(config);

        // Jitter adds at most 50%, so by the sixth attempt the base alone
        // has hit the ceiling.
        let mut last = Duration::ZERO;
        for _ in 0..6 {
            last = backoff.next_delay();
        }
        assert!(last >= Duration::from_millis(3200 / 2));
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let config = BackoffConfig::default();
        let mut backoff = Backoff::new(config);

        for _ in 0..5 {
            backoff.next_delay();
        }
        assert_eq!(backoff.attempt(), 5);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);

        let first = backoff.next_delay();
        assert!(first <= config.min_delay + config.min_delay / 2);
    }

    #[test]
    fn test_attempt_counter_never_overflows() {
        let mut backoff = Backoff::new(BackoffConfig::default());
        backoff.attempt = u32::MAX;

        let delay = backoff.next_delay();
        assert!(delay <= BackoffConfig::default().max_delay);
        assert_eq!(backoff.attempt(), u32::MAX);
    }
}
