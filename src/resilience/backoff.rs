//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is the 1-based number of the attempt that just failed.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Upper bound of [`calculate_backoff`] for `attempt`, jitter included.
pub fn max_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let capped_delay = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms);
    Duration::from_millis(capped_delay + capped_delay / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_exponentially() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200 && b2.as_millis() < 220);
    }

    #[test]
    fn test_backoff_is_capped() {
        let capped = calculate_backoff(10, 100, 1000);
        assert!(capped.as_millis() >= 1000 && capped.as_millis() < 1100);

        let huge = calculate_backoff(200, 100, 1000);
        assert!(huge.as_millis() < 1100);
    }

    #[test]
    fn test_max_backoff_bounds_every_draw() {
        for attempt in 1..6 {
            let bound = max_backoff(attempt, 200, 2000);
            for _ in 0..50 {
                assert!(calculate_backoff(attempt, 200, 2000) <= bound);
            }
        }
        assert_eq!(max_backoff(1, 200, 2000), Duration::from_millis(220));
        assert_eq!(max_backoff(8, 200, 2000), Duration::from_millis(2200));
    }

    #[test]
    fn test_zero_attempt_has_no_delay() {
        assert_eq!(calculate_backoff(0, 100, 1000), Duration::ZERO);
    }
}
