//! Backoff calculation for reconnect attempts.

use std::time::Duration;

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Exponential backoff: `min(max_delay, base_delay * 2^attempt)`.
///
/// `attempt` is zero-based (0 after the first failure).
#[must_use]
pub fn backoff_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(exponential.min(max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        assert_eq!(backoff_delay(0, 500, 30_000), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, 500, 30_000), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, 500, 30_000), Duration::from_millis(4000));
    }

    #[test]
    fn caps_at_max() {
        assert_eq!(backoff_delay(10, 500, 30_000), Duration::from_millis(30_000));
    }

    #[test]
    fn high_attempt_no_overflow() {
        assert_eq!(backoff_delay(200, 1000, 60_000), Duration::from_millis(60_000));
    }

    #[test]
    fn zero_base_disables_backoff() {
        assert_eq!(backoff_delay(5, 0, 30_000), Duration::ZERO);
    }
}
