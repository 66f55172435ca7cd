//! Strategy evaluator implementing the [`RewardCalculator`] trait.
//!
//! Every variant is reduced to a gross reward in floating point, floored to
//! whole units, and collected rewards are subtracted (saturating) by the
//! trait's default `claimable`. The subtraction is the same for all three
//! variants, including the tiered one before its first threshold.

use num_traits::ToPrimitive;
use tracing::trace;

use lockup_core::error::{ConfigurationError, RewardError};
use lockup_core::traits::RewardCalculator;
use lockup_core::types::Quantity;

use crate::strategy::{RewardStrategy, Tier};

/// The production reward calculator.
///
/// Only constructible from a strategy that passed
/// [`RewardStrategy::normalize`], so tiers are always in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEvaluator {
    strategy: RewardStrategy,
}

impl StrategyEvaluator {
    /// Validate and normalise `strategy`, then wrap it.
    pub fn new(strategy: RewardStrategy) -> Result<Self, ConfigurationError> {
        Ok(Self {
            strategy: strategy.normalize()?,
        })
    }

    pub fn strategy(&self) -> &RewardStrategy {
        &self.strategy
    }

    /// Gross reward before flooring.
    fn gross(&self, quantity: f64, days: f64) -> f64 {
        match &self.strategy {
            RewardStrategy::Linear { rate } => quantity * days * rate,
            RewardStrategy::Tiered { tiers } => match qualifying_tier(tiers, days) {
                Some(tier) => tier.per_unit_reward * quantity,
                None => 0.0,
            },
            RewardStrategy::Custom { formula } => formula.apply(quantity, days),
        }
    }
}

/// Highest tier whose threshold is at or below `days`.
///
/// Tiers are ascending, so the scan stops at the first threshold beyond `days`.
fn qualifying_tier(tiers: &[Tier], days: f64) -> Option<&Tier> {
    let mut found = None;
    for tier in tiers {
        if tier.threshold_days > days {
            break;
        }
        found = Some(tier);
    }
    found
}

/// Floor a non-negative reward to whole units.
fn floor_units(value: f64) -> Result<Quantity, RewardError> {
    if !value.is_finite() {
        return Err(RewardError::NonFinite(value));
    }
    if value <= 0.0 {
        return Ok(0);
    }
    value.floor().to_u128().ok_or(RewardError::Overflow)
}

impl RewardCalculator for StrategyEvaluator {
    fn accrued(&self, quantity: Quantity, days_elapsed: f64) -> Result<Quantity, RewardError> {
        let q = quantity.to_f64().ok_or(RewardError::Overflow)?;
        let days = days_elapsed.max(0.0);
        let gross = self.gross(q, days);
        trace!(quantity, days, gross, "evaluated reward strategy");
        floor_units(gross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::CustomFormula;
    use proptest::prelude::*;

    fn linear(rate: f64) -> StrategyEvaluator {
        StrategyEvaluator::new(RewardStrategy::Linear { rate }).unwrap()
    }

    fn tiered() -> StrategyEvaluator {
        StrategyEvaluator::new(RewardStrategy::Tiered {
            tiers: vec![Tier::new(7.0, 10.0), Tier::new(30.0, 35.0), Tier::new(1.0, 1.0)],
        })
        .unwrap()
    }

    // --- linear ---

    #[test]
    fn linear_half_day() {
        // floor(5 × 0.5 × 0.5) = floor(1.25)
        assert_eq!(linear(0.5).claimable(5, 0.5, 0).unwrap(), 1);
    }

    #[test]
    fn linear_zero_time() {
        assert_eq!(linear(0.5).claimable(5, 0.0, 0).unwrap(), 0);
    }

    #[test]
    fn linear_subtracts_collected() {
        // floor(10 × 2 × 1) - 7
        assert_eq!(linear(1.0).claimable(10, 2.0, 7).unwrap(), 13);
    }

    #[test]
    fn negative_days_clamped() {
        assert_eq!(linear(1.0).claimable(10, -3.0, 0).unwrap(), 0);
    }

    // --- tiered ---

    #[test]
    fn tiered_before_first_threshold() {
        assert_eq!(tiered().claimable(3, 0.99, 0).unwrap(), 0);
    }

    #[test]
    fn tiered_exactly_at_threshold() {
        assert_eq!(tiered().claimable(3, 1.0, 0).unwrap(), 3);
    }

    #[test]
    fn tiered_tie_break_after_collection() {
        // 10 × 3 - 3 already collected
        assert_eq!(tiered().claimable(3, 7.0, 3).unwrap(), 27);
    }

    #[test]
    fn tiered_between_thresholds_uses_lower() {
        assert_eq!(tiered().claimable(3, 29.9, 0).unwrap(), 30);
    }

    #[test]
    fn tiered_beyond_last() {
        assert_eq!(tiered().claimable(3, 400.0, 0).unwrap(), 105);
    }

    #[test]
    fn tiered_no_tier_still_subtracts() {
        assert_eq!(tiered().claimable(3, 0.5, 3).unwrap(), 0);
    }

    #[test]
    fn duplicate_thresholds_take_last() {
        let e = StrategyEvaluator::new(RewardStrategy::Tiered {
            tiers: vec![Tier::new(1.0, 2.0), Tier::new(1.0, 5.0)],
        })
        .unwrap();
        assert_eq!(e.claimable(1, 1.0, 0).unwrap(), 5);
    }

    // --- custom ---

    #[test]
    fn custom_quadratic_floors() {
        let e = StrategyEvaluator::new(RewardStrategy::Custom {
            formula: CustomFormula::Quadratic { coefficient: 1.0 },
        })
        .unwrap();
        // 2 × 1.5² = 4.5
        assert_eq!(e.claimable(2, 1.5, 0).unwrap(), 4);
    }

    #[test]
    fn custom_capped_stops_growing() {
        let e = StrategyEvaluator::new(RewardStrategy::Custom {
            formula: CustomFormula::Capped {
                rate: 1.0,
                cap_days: 2.0,
            },
        })
        .unwrap();
        assert_eq!(e.accrued(10, 2.0).unwrap(), e.accrued(10, 50.0).unwrap());
    }

    #[test]
    fn overflow_reported() {
        let e = linear(1e30);
        assert_eq!(e.accrued(u128::MAX, 1e10).unwrap_err(), RewardError::Overflow);
    }

    #[test]
    fn invalid_strategy_rejected_at_construction() {
        assert!(StrategyEvaluator::new(RewardStrategy::Linear { rate: f64::NAN }).is_err());
    }

    proptest! {
        #[test]
        fn linear_monotonic_in_time(q in 0u64..1_000_000, a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
            let e = linear(0.37);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(e.accrued(q as u128, lo).unwrap() <= e.accrued(q as u128, hi).unwrap());
        }

        #[test]
        fn tiered_monotonic_in_time(q in 0u64..1_000_000, a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let e = tiered();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(e.accrued(q as u128, lo).unwrap() <= e.accrued(q as u128, hi).unwrap());
        }

        #[test]
        fn floor_never_exceeds_gross(q in 0u64..1_000_000, d in 0.0f64..1000.0) {
            let e = linear(0.5);
            let accrued = e.accrued(q as u128, d).unwrap() as f64;
            prop_assert!(accrued <= q as f64 * d * 0.5);
            prop_assert!(q as f64 * d * 0.5 - accrued < 1.0 + 1e-6 * accrued.max(1.0));
        }
    }
}
