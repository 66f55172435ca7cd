//! # lockup-rewards — Reward accrual strategies.
//!
//! A strategy maps the quantity locked and the fractional days it has been
//! locked in to a reward amount, floored to whole units:
//! - **Linear**: `floor(quantity × days × rate)`
//! - **Tiered**: `floor(per_unit × quantity)` for the highest tier whose
//!   threshold has been reached, 0 before the first threshold
//! - **Custom**: `floor(formula(quantity, days))` over a predeclared set of
//!   formulas
//!
//! Strategies are validated and normalised once (tiers sorted ascending) when
//! an [`StrategyEvaluator`] is built; evaluation itself is pure.

pub mod evaluator;
pub mod strategy;

pub use evaluator::StrategyEvaluator;
pub use strategy::{CustomFormula, RewardStrategy, Tier};
