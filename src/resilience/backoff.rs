//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate the delay to wait after the failed attempt `attempt` (0-indexed).
///
/// The delay is `base * 2^attempt`, saturating and capped at `max`. With
/// `jitter` enabled, up to 10% of the capped delay is added, still within `max`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, jitter: bool) -> Duration {
    let factor = 1u128.checked_shl(attempt).unwrap_or(u128::MAX);
    let max_nanos = max.as_nanos();
    let capped_delay = base.as_nanos().saturating_mul(factor).min(max_nanos);

    if !jitter {
        return from_nanos(capped_delay);
    }

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    from_nanos(capped_delay.saturating_add(jitter).min(max_nanos))
}

fn from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_millis(2000);

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, BASE, MAX, false), Duration::from_millis(100));
        assert_eq!(calculate_backoff(1, BASE, MAX, false), Duration::from_millis(200));
        assert_eq!(calculate_backoff(2, BASE, MAX, false), Duration::from_millis(400));
        assert_eq!(calculate_backoff(10, BASE, MAX, false), MAX);
    }

    #[test]
    fn test_backoff_is_monotonic_and_never_overflows() {
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = calculate_backoff(attempt, BASE, Duration::from_secs(30), false);
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(previous, Duration::from_secs(30));
        assert_eq!(
            calculate_backoff(u32::MAX, Duration::from_secs(u64::MAX / 1000), Duration::MAX, false),
            Duration::MAX
        );
        assert_eq!(calculate_backoff(u32::MAX, Duration::ZERO, MAX, false), Duration::ZERO);
    }

    #[test]
    fn test_sub_millisecond_base_is_kept() {
        let base = Duration::from_micros(1500);
        let max = Duration::from_secs(30);
        assert_eq!(calculate_backoff(0, base, max, false), Duration::from_micros(1500));
        assert_eq!(calculate_backoff(1, base, max, false), Duration::from_micros(3000));
        assert_eq!(
            calculate_backoff(2, Duration::from_micros(500), max, false),
            Duration::from_millis(2)
        );
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        for attempt in 0..5 {
            let plain = calculate_backoff(attempt, BASE, MAX, false);
            let jittered = calculate_backoff(attempt, BASE, MAX, true);
            assert!(jittered >= plain);
            assert!(jittered <= plain + plain / 10);
        }
    }

    #[test]
    fn test_jitter_never_exceeds_ceiling() {
        let max = Duration::from_secs(1);
        for _ in 0..100 {
            assert!(calculate_backoff(20, BASE, max, true) <= max);
        }
    }
}
