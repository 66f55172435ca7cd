//! Reward strategy descriptors and their one-time validation.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use lockup_core::constants::DEFAULT_LINEAR_RATE;
use lockup_core::error::ConfigurationError;

fn default_rate() -> f64 {
    DEFAULT_LINEAR_RATE
}

/// One step of a tiered strategy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Tier {
    /// Days locked in before this tier applies.
    pub threshold_days: f64,
    /// Total reward per locked unit once this tier applies.
    pub per_unit_reward: f64,
}

impl Tier {
    pub fn new(threshold_days: f64, per_unit_reward: f64) -> Self {
        Self {
            threshold_days,
            per_unit_reward,
        }
    }
}

/// Predeclared formulas for custom strategies.
///
/// `q` is the quantity locked, `d` the fractional days locked in.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomFormula {
    /// `coefficient × q × d²`
    Quadratic { coefficient: f64 },
    /// `coefficient × q × d^exponent`
    Power { coefficient: f64, exponent: f64 },
    /// `coefficient × q × ln(1 + d)`
    Logarithmic { coefficient: f64 },
    /// `rate × q × min(d, cap_days)`
    Capped { rate: f64, cap_days: f64 },
}

impl CustomFormula {
    /// Evaluate the formula without rounding.
    pub fn apply(&self, quantity: f64, days: f64) -> f64 {
        match *self {
            Self::Quadratic { coefficient } => coefficient * quantity * days * days,
            Self::Power {
                coefficient,
                exponent,
            } => coefficient * quantity * days.powf(exponent),
            Self::Logarithmic { coefficient } => coefficient * quantity * days.ln_1p(),
            Self::Capped { rate, cap_days } => rate * quantity * days.min(cap_days),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::Quadratic { coefficient } | Self::Logarithmic { coefficient } => {
                non_negative("coefficient", coefficient)
            }
            Self::Power {
                coefficient,
                exponent,
            } => {
                non_negative("coefficient", coefficient)?;
                non_negative("exponent", exponent)
            }
            Self::Capped { rate, cap_days } => {
                non_negative("rate", rate)?;
                non_negative("cap_days", cap_days)
            }
        }
    }
}

/// How locked quantity and elapsed time turn into reward.
///
/// Chosen once at configuration time and immutable afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardStrategy {
    Linear {
        #[serde(default = "default_rate")]
        rate: f64,
    },
    Tiered {
        tiers: Vec<Tier>,
    },
    Custom {
        formula: CustomFormula,
    },
}

impl Default for RewardStrategy {
    fn default() -> Self {
        Self::Linear {
            rate: DEFAULT_LINEAR_RATE,
        }
    }
}

impl RewardStrategy {
    pub fn is_tiered(&self) -> bool {
        matches!(self, Self::Tiered { .. })
    }

    /// Check every parameter and sort tiers ascending by threshold.
    ///
    /// Evaluation relies on the tier order, so this must run before first use.
    pub fn normalize(self) -> Result<Self, ConfigurationError> {
        match self {
            Self::Linear { rate } => {
                non_negative("rate", rate)?;
                Ok(Self::Linear { rate })
            }
            Self::Tiered { mut tiers } => {
                if tiers.is_empty() {
                    return Err(ConfigurationError::EmptyTiers);
                }
                for (index, tier) in tiers.iter().enumerate() {
                    if !tier.threshold_days.is_finite() || tier.threshold_days < 0.0 {
                        return Err(ConfigurationError::MalformedTier {
                            index,
                            reason: format!("threshold_days = {}", tier.threshold_days),
                        });
                    }
                    if !tier.per_unit_reward.is_finite() || tier.per_unit_reward < 0.0 {
                        return Err(ConfigurationError::MalformedTier {
                            index,
                            reason: format!("per_unit_reward = {}", tier.per_unit_reward),
                        });
                    }
                }
                tiers.sort_by_key(|tier| OrderedFloat(tier.threshold_days));
                Ok(Self::Tiered { tiers })
            }
            Self::Custom { formula } => {
                formula.validate()?;
                Ok(Self::Custom { formula })
            }
        }
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_sorted_on_normalize() {
        let strategy = RewardStrategy::Tiered {
            tiers: vec![Tier::new(30.0, 35.0), Tier::new(1.0, 1.0), Tier::new(7.0, 10.0)],
        };
        let RewardStrategy::Tiered { tiers } = strategy.normalize().unwrap() else {
            panic!("expected tiered");
        };
        let thresholds: Vec<f64> = tiers.iter().map(|t| t.threshold_days).collect();
        assert_eq!(thresholds, vec![1.0, 7.0, 30.0]);
    }

    #[test]
    fn empty_tiers_rejected() {
        let err = RewardStrategy::Tiered { tiers: vec![] }.normalize().unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyTiers);
    }

    #[test]
    fn negative_threshold_rejected() {
        let err = RewardStrategy::Tiered {
            tiers: vec![Tier::new(1.0, 1.0), Tier::new(-2.0, 3.0)],
        }
        .normalize()
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedTier { index: 1, .. }));
    }

    #[test]
    fn nan_reward_rejected() {
        let err = RewardStrategy::Tiered {
            tiers: vec![Tier::new(1.0, f64::NAN)],
        }
        .normalize()
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedTier { index: 0, .. }));
    }

    #[test]
    fn negative_rate_rejected() {
        let err = RewardStrategy::Linear { rate: -0.5 }.normalize().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidParameter {
                name: "rate",
                value: -0.5
            }
        );
    }

    #[test]
    fn custom_infinite_exponent_rejected() {
        let formula = CustomFormula::Power {
            coefficient: 1.0,
            exponent: f64::INFINITY,
        };
        assert!(RewardStrategy::Custom { formula }.normalize().is_err());
    }

    #[test]
    fn linear_rate_defaults_to_one() {
        let s: RewardStrategy = serde_json::from_str(r#"{"type":"linear"}"#).unwrap();
        assert_eq!(s, RewardStrategy::Linear { rate: 1.0 });
    }

    #[test]
    fn tiered_from_json() {
        let s: RewardStrategy = serde_json::from_str(
            r#"{"type":"tiered","tiers":[{"threshold_days":7,"per_unit_reward":10}]}"#,
        )
        .unwrap();
        assert!(s.is_tiered());
    }

    #[test]
    fn custom_from_json() {
        let s: RewardStrategy = serde_json::from_str(
            r#"{"type":"custom","formula":{"kind":"capped","rate":2.0,"cap_days":10.0}}"#,
        )
        .unwrap();
        assert_eq!(
            s,
            RewardStrategy::Custom {
                formula: CustomFormula::Capped {
                    rate: 2.0,
                    cap_days: 10.0
                }
            }
        );
    }

    #[test]
    fn formulas() {
        assert_eq!(CustomFormula::Quadratic { coefficient: 0.5 }.apply(4.0, 3.0), 18.0);
        assert_eq!(
            CustomFormula::Power {
                coefficient: 1.0,
                exponent: 0.5
            }
            .apply(2.0, 16.0),
            8.0
        );
        assert_eq!(CustomFormula::Logarithmic { coefficient: 1.0 }.apply(5.0, 0.0), 0.0);
        assert_eq!(
            CustomFormula::Capped {
                rate: 1.0,
                cap_days: 10.0
            }
            .apply(2.0, 25.0),
            20.0
        );
    }
}
