//! Trait interfaces for the lockup engine.
//!
//! These traits define the contracts between crates and with the outside:
//! - [`RewardCalculator`] — pure accrual math (lockup-rewards implements)
//! - [`SettlementFacility`] — atomic value transfer, token mint and burn
//! - [`Clock`] — current time and periodic ticks

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{RewardError, SettlementError};
use crate::types::{Quantity, Reallocation, Settled, Timestamp, TokenSerial};

/// Pure computation of claimable rewards.
///
/// Given the quantity locked, the (fractional) days it has been locked in,
/// and the reward already collected, returns the whole units that can be
/// claimed now. Sub-unit remainders are floored away.
pub trait RewardCalculator: Send + Sync {
    /// Total reward accrued so far, floored, before subtracting collections.
    fn accrued(&self, quantity: Quantity, days_elapsed: f64) -> Result<Quantity, RewardError>;

    /// Reward currently claimable.
    ///
    /// Default implementation: `accrued - collected`, saturating at zero.
    fn claimable(
        &self,
        quantity: Quantity,
        days_elapsed: f64,
        collected: Quantity,
    ) -> Result<Quantity, RewardError> {
        Ok(self.accrued(quantity, days_elapsed)?.saturating_sub(collected))
    }
}

/// Atomic multi-asset settlement with token minting.
///
/// Implementations apply every part of a [`Reallocation`] or none of it, so a
/// failed call leaves all balances and live tokens exactly as they were.
#[async_trait]
pub trait SettlementFacility: Send + Sync {
    /// Apply one reallocation as a unit.
    async fn settle(&self, reallocation: Reallocation) -> Result<Settled, SettlementError>;

    /// Whether a token with this serial is currently minted.
    fn is_live(&self, serial: TokenSerial) -> bool;
}

/// Source of time for the engine.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    async fn now(&self) -> Timestamp;

    /// Stream of tick instants, one every `interval_secs`.
    fn subscribe_ticks(&self, interval_secs: u64) -> broadcast::Receiver<Timestamp>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One unit per locked unit per day.
    struct PerDay;

    impl RewardCalculator for PerDay {
        fn accrued(&self, quantity: Quantity, days_elapsed: f64) -> Result<Quantity, RewardError> {
            Ok(quantity * days_elapsed.floor() as Quantity)
        }
    }

    #[test]
    fn claimable_subtracts_collected() {
        assert_eq!(PerDay.claimable(3, 2.5, 4).unwrap(), 2);
    }

    #[test]
    fn claimable_saturates() {
        assert_eq!(PerDay.claimable(3, 1.0, 10).unwrap(), 0);
    }
}
