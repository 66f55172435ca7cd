//! Conversions between clock seconds and elapsed days.
//!
//! Days are kept fractional on purpose: linear and custom strategies reward
//! sub-day lock-in time, so nothing here rounds.

use crate::constants::SECONDS_PER_DAY;
use crate::types::Timestamp;

/// `days × 86 400`, exact.
pub fn days_to_seconds(days: f64) -> f64 {
    days * SECONDS_PER_DAY as f64
}

/// `seconds / 86 400`, not floored.
pub fn seconds_to_days(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY as f64
}

/// Instant at which a period of `days` starting at `start` ends.
pub fn cutover(start: Timestamp, days: f64) -> f64 {
    start as f64 + days_to_seconds(days)
}

/// Whether `days` is usable as a bonding or unbonding period.
pub fn is_valid_period(days: f64) -> bool {
    days.is_finite() && days >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn whole_days() {
        assert_eq!(days_to_seconds(1.0), 86_400.0);
        assert_eq!(days_to_seconds(7.0), 604_800.0);
    }

    #[test]
    fn fractional_days_preserved() {
        assert_eq!(seconds_to_days(43_200.0), 0.5);
        assert_eq!(seconds_to_days(3_600.0), 1.0 / 24.0);
    }

    #[test]
    fn cutover_adds_period() {
        assert_eq!(cutover(1_000, 1.0), 87_400.0);
        assert_eq!(cutover(1_000, 0.0), 1_000.0);
    }

    #[test]
    fn period_validity() {
        assert!(is_valid_period(0.0));
        assert!(is_valid_period(30.5));
        assert!(!is_valid_period(-1.0));
        assert!(!is_valid_period(f64::NAN));
        assert!(!is_valid_period(f64::INFINITY));
    }

    proptest! {
        #[test]
        fn whole_second_roundtrip(secs in 0u64..10_000_000_000) {
            let days = seconds_to_days(secs as f64);
            prop_assert!((days_to_seconds(days) - secs as f64).abs() < 1e-3);
        }
    }
}
