//! Engine configuration.
//!
//! [`EngineConfig`] is what operators write (TOML file plus `LOCKUP__*`
//! environment overrides). It only becomes usable through
//! [`EngineConfig::validate`], which rejects inconsistent combinations and
//! normalises the reward strategy once.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lockup_core::constants::{
    DEFAULT_LOW_POOL_WARNING, DEFAULT_TICK_INTERVAL_SECS, DEFAULT_UNBONDING_PERIOD_DAYS,
};
use lockup_core::error::ConfigurationError;
use lockup_core::time::is_valid_period;
use lockup_core::types::{AssetClass, LockupStrategy, Quantity};
use lockup_rewards::{RewardStrategy, StrategyEvaluator};

/// Prefix for environment overrides, e.g. `LOCKUP__TICK_INTERVAL_SECS=60`.
pub const ENV_PREFIX: &str = "LOCKUP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// How positions become redeemable.
    pub lockup_strategy: LockupStrategy,
    /// How rewards accrue.
    pub reward_strategy: RewardStrategy,
    /// Asset classes accepted for locking.
    pub supported_assets: Vec<AssetClass>,
    /// Asset class paid out as reward.
    pub reward_asset: AssetClass,
    /// Seconds between fan-out ticks.
    pub tick_interval_secs: u64,
    /// Pool balance below which a low-liquidity warning is logged.
    pub low_pool_warning: u64,
    /// Unbonding period used when unlock does not name one.
    pub default_unbonding_period_days: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lockup_strategy: LockupStrategy::default(),
            reward_strategy: RewardStrategy::default(),
            supported_assets: vec![AssetClass::new("LP")],
            reward_asset: AssetClass::new("GOV"),
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            low_pool_warning: DEFAULT_LOW_POOL_WARNING,
            default_unbonding_period_days: DEFAULT_UNBONDING_PERIOD_DAYS,
        }
    }
}

/// A configuration that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub lockup_strategy: LockupStrategy,
    pub evaluator: StrategyEvaluator,
    pub supported_assets: BTreeSet<AssetClass>,
    pub reward_asset: AssetClass,
    pub tick_interval_secs: u64,
    pub low_pool_warning: Quantity,
    pub default_unbonding_period_days: f64,
}

impl EngineConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<EngineConfig>())
            .map_err(|e| ConfigurationError::Load(e.to_string()))
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigurationError> {
        if self.reward_strategy.is_tiered()
            && self.lockup_strategy == LockupStrategy::UnlockOnDemand
        {
            return Err(ConfigurationError::TieredWithUnlock);
        }
        if self.supported_assets.is_empty() {
            return Err(ConfigurationError::NoSupportedAssets);
        }
        if self.supported_assets.contains(&self.reward_asset) {
            return Err(ConfigurationError::RewardAssetLockable(self.reward_asset.clone()));
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigurationError::ZeroTickInterval);
        }
        if !is_valid_period(self.default_unbonding_period_days) {
            return Err(ConfigurationError::InvalidDefaultUnbonding(
                self.default_unbonding_period_days,
            ));
        }
        let evaluator = StrategyEvaluator::new(self.reward_strategy.clone())?;

        Ok(ValidatedConfig {
            lockup_strategy: self.lockup_strategy,
            evaluator,
            supported_assets: self.supported_assets.iter().cloned().collect(),
            reward_asset: self.reward_asset.clone(),
            tick_interval_secs: self.tick_interval_secs,
            low_pool_warning: Quantity::from(self.low_pool_warning),
            default_unbonding_period_days: self.default_unbonding_period_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockup_rewards::Tier;
    use std::io::Write;

    #[test]
    fn default_is_valid() {
        let v = EngineConfig::default().validate().unwrap();
        assert_eq!(v.tick_interval_secs, 3600);
        assert_eq!(v.low_pool_warning, 100);
        assert!(v.supported_assets.contains(&AssetClass::new("LP")));
    }

    #[test]
    fn tiered_with_unlock_rejected() {
        let cfg = EngineConfig {
            lockup_strategy: LockupStrategy::UnlockOnDemand,
            reward_strategy: RewardStrategy::Tiered {
                tiers: vec![Tier::new(1.0, 1.0)],
            },
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigurationError::TieredWithUnlock);
    }

    #[test]
    fn reward_asset_cannot_be_locked() {
        let cfg = EngineConfig {
            supported_assets: vec!["LP".into(), "GOV".into()],
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigurationError::RewardAssetLockable("GOV".into())
        );
    }

    #[test]
    fn empty_allow_list_rejected() {
        let cfg = EngineConfig {
            supported_assets: vec![],
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigurationError::NoSupportedAssets);
    }

    #[test]
    fn zero_tick_rejected() {
        let cfg = EngineConfig {
            tick_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigurationError::ZeroTickInterval);
    }

    #[test]
    fn malformed_strategy_surfaces() {
        let cfg = EngineConfig {
            reward_strategy: RewardStrategy::Tiered { tiers: vec![] },
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigurationError::EmptyTiers);
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
lockup_strategy = "unlock_on_demand"
supported_assets = ["MOOLA", "VAN"]
reward_asset = "GOV"
tick_interval_secs = 60

[reward_strategy]
type = "linear"
rate = 0.5
"#
        )
        .unwrap();

        let cfg = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.lockup_strategy, LockupStrategy::UnlockOnDemand);
        assert_eq!(cfg.reward_strategy, RewardStrategy::Linear { rate: 0.5 });
        assert_eq!(cfg.supported_assets, vec![AssetClass::new("MOOLA"), AssetClass::new("VAN")]);
        assert_eq!(cfg.tick_interval_secs, 60);
        assert_eq!(cfg.default_unbonding_period_days, 1.0);
    }

    #[test]
    fn load_tiers_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[reward_strategy]
type = "tiered"

[[reward_strategy.tiers]]
threshold_days = 30.0
per_unit_reward = 35.0

[[reward_strategy.tiers]]
threshold_days = 1.0
per_unit_reward = 1.0
"#
        )
        .unwrap();

        let cfg = EngineConfig::load(Some(file.path())).unwrap();
        let validated = cfg.validate().unwrap();
        let RewardStrategy::Tiered { tiers } = validated.evaluator.strategy() else {
            panic!("expected tiered strategy");
        };
        assert_eq!(tiers[0].threshold_days, 1.0);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/lockup.toml"))).unwrap_err();
        assert!(matches!(err, ConfigurationError::Load(_)));
    }
}
