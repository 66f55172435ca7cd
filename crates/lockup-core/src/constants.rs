//! Engine constants. Quantities are in the smallest unit of their asset class.

/// Seconds in one day. All bonding and unbonding periods are expressed in days.
pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Default cadence of the clock ticks that drive the notification fan-out.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 3600;

/// Reward pool balance below which the engine logs a low-liquidity warning.
pub const DEFAULT_LOW_POOL_WARNING: u64 = 100;

/// Unbonding period applied when `unlock` is called without one.
pub const DEFAULT_UNBONDING_PERIOD_DAYS: f64 = 1.0;

/// Per-unit, per-day rate used by the linear strategy when none is configured.
pub const DEFAULT_LINEAR_RATE: f64 = 1.0;

/// Account that holds escrowed assets and reward liquidity on behalf of the engine.
pub const ESCROW_ACCOUNT: &str = "lockup-escrow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_day_in_seconds() {
        assert_eq!(SECONDS_PER_DAY, 86_400);
    }

    #[test]
    fn hourly_ticks_by_default() {
        assert_eq!(DEFAULT_TICK_INTERVAL_SECS, 60 * 60);
    }
}
