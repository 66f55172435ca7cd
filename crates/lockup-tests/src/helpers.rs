//! Shared fixtures for the integration tests.

use std::sync::Arc;

use lockup_core::constants::SECONDS_PER_DAY;
use lockup_core::traits::{Clock, SettlementFacility};
use lockup_core::types::{AccountId, Amount, LockupStrategy, Quantity, Timestamp};
use lockup_engine::clock::ManualClock;
use lockup_engine::settlement::LedgerSettlement;
use lockup_engine::{EngineConfig, LockupEngine, OperatorFacet};
use lockup_rewards::{RewardStrategy, Tier};

/// Start time for every harness clock.
pub const T0: Timestamp = 1_700_000_000;

/// Locked-asset balance every participant starts with.
pub const STARTING_LP: Quantity = 1_000;

/// Reward-asset balance the operator starts with.
pub const OPERATOR_GOV: Quantity = 1_000_000;

pub fn lp(quantity: Quantity) -> Amount {
    Amount::new("LP", quantity)
}

pub fn gov(quantity: Quantity) -> Amount {
    Amount::new("GOV", quantity)
}

pub fn alice() -> AccountId {
    AccountId::new("alice")
}

pub fn bob() -> AccountId {
    AccountId::new("bob")
}

pub fn operator_account() -> AccountId {
    AccountId::new("operator")
}

/// Timed lockups with linear accrual at `rate`.
pub fn timed_linear(rate: f64) -> EngineConfig {
    EngineConfig {
        reward_strategy: RewardStrategy::Linear { rate },
        ..EngineConfig::default()
    }
}

/// Timed lockups with tiered accrual.
pub fn timed_tiered(tiers: &[(f64, f64)]) -> EngineConfig {
    EngineConfig {
        reward_strategy: RewardStrategy::Tiered {
            tiers: tiers.iter().map(|&(d, r)| Tier::new(d, r)).collect(),
        },
        ..EngineConfig::default()
    }
}

/// Unlock-on-demand lockups with linear accrual at `rate`.
pub fn on_demand_linear(rate: f64) -> EngineConfig {
    EngineConfig {
        lockup_strategy: LockupStrategy::UnlockOnDemand,
        reward_strategy: RewardStrategy::Linear { rate },
        ..EngineConfig::default()
    }
}

/// A running engine with funded participants.
pub struct Harness {
    pub engine: Arc<LockupEngine>,
    pub operator: OperatorFacet,
    pub ledger: Arc<LedgerSettlement>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn start(config: EngineConfig) -> Self {
        let ledger = Arc::new(LedgerSettlement::new());
        let clock = Arc::new(ManualClock::new(T0));
        for party in [alice(), bob()] {
            ledger.credit(&party, &lp(STARTING_LP)).unwrap();
        }
        ledger.credit(&operator_account(), &gov(OPERATOR_GOV)).unwrap();

        let (engine, operator) = LockupEngine::start(
            &config,
            Arc::clone(&ledger) as Arc<dyn SettlementFacility>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        Self {
            engine,
            operator,
            ledger,
            clock,
        }
    }

    /// Fund the reward pool from the operator account.
    pub async fn fund(&self, quantity: Quantity) -> Quantity {
        self.operator
            .add_reward_liquidity(&operator_account(), gov(quantity))
            .await
            .unwrap()
    }

    /// Move the clock forward by (possibly fractional) days.
    pub fn advance_days(&self, days: f64) -> Timestamp {
        self.clock.advance((days * SECONDS_PER_DAY as f64) as u64)
    }

    pub fn lp_balance(&self, party: &AccountId) -> Quantity {
        self.ledger.balance(party, &"LP".into())
    }

    pub fn gov_balance(&self, party: &AccountId) -> Quantity {
        self.ledger.balance(party, &"GOV".into())
    }
}
