//! Lockup lifecycle operations.
//!
//! [`LockupEngine`] is the public facet: lock, unlock, redeem, reward
//! withdrawal and read-only queries. [`OperatorFacet`] is handed out once,
//! at start, and is the only way to fund the reward pool or extend the
//! supported-asset list.
//!
//! Every operation resolves its position by the token's lockup id, then
//! holds that position's lock until it returns. Registry, pool and position
//! mutations happen only after the settlement call succeeded, so a failed
//! call leaves everything as it was.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use lockup_core::error::{
    ConfigurationError, LockupError, NotFoundError, PreconditionError, SettlementError,
    ValidationError,
};
use lockup_core::time::is_valid_period;
use lockup_core::traits::{Clock, SettlementFacility};
use lockup_core::types::{
    AccountId, Amount, AssetClass, CapabilityToken, LockArgs, LockupId, LockupState,
    LockupStrategy, Quantity, Reallocation, Settled, TokenPayload,
};
use lockup_rewards::StrategyEvaluator;

use crate::config::{EngineConfig, ValidatedConfig};
use crate::notifier::{self, Subscription};
use crate::pool::{PoolLedger, RewardPool};
use crate::position::{Position, PositionPhase, PositionSnapshot};
use crate::registry::{PositionHandle, Registry};

/// Result of a successful lock.
#[derive(Debug)]
pub struct LockReceipt {
    pub message: String,
    pub token: CapabilityToken,
    pub subscription: Subscription,
}

/// Result of a successful unlock. Carries the replacement token and channel.
#[derive(Debug)]
pub struct UnlockReceipt {
    pub message: String,
    pub token: CapabilityToken,
    pub subscription: Subscription,
}

/// Result of a successful reward withdrawal. The token is returned as is.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WithdrawReceipt {
    pub message: String,
    pub payout: Amount,
    pub token: CapabilityToken,
}

/// Result of a successful redemption.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RedeemReceipt {
    pub message: String,
    pub returned: Amount,
}

pub struct LockupEngine {
    config: ValidatedConfig,
    supported_assets: RwLock<BTreeSet<AssetClass>>,
    registry: Registry,
    pool: RewardPool,
    settlement: Arc<dyn SettlementFacility>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LockupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockupEngine")
            .field("lockup_strategy", &self.config.lockup_strategy)
            .field("reward_asset", &self.config.reward_asset)
            .field("positions", &self.registry.len())
            .field("pool", &self.pool.ledger())
            .finish_non_exhaustive()
    }
}

/// Operator-only capability over a running engine.
#[derive(Debug)]
pub struct OperatorFacet {
    engine: Arc<LockupEngine>,
}

impl LockupEngine {
    /// Validate `config` and start an engine.
    ///
    /// Returns the shared public handle and the single operator facet.
    pub fn start(
        config: &EngineConfig,
        settlement: Arc<dyn SettlementFacility>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Arc<Self>, OperatorFacet), ConfigurationError> {
        let config = config.validate()?;
        info!(
            lockup_strategy = ?config.lockup_strategy,
            reward_strategy = ?config.evaluator.strategy(),
            reward_asset = %config.reward_asset,
            supported = config.supported_assets.len(),
            "lockup engine started"
        );
        let engine = Arc::new(Self {
            supported_assets: RwLock::new(config.supported_assets.clone()),
            registry: Registry::new(),
            pool: RewardPool::new(config.low_pool_warning),
            settlement,
            clock,
            config,
        });
        let operator = OperatorFacet {
            engine: Arc::clone(&engine),
        };
        Ok((engine, operator))
    }

    pub fn lockup_strategy(&self) -> LockupStrategy {
        self.config.lockup_strategy
    }

    pub fn reward_asset(&self) -> &AssetClass {
        &self.config.reward_asset
    }

    pub fn evaluator(&self) -> &StrategyEvaluator {
        &self.config.evaluator
    }

    pub fn tick_interval_secs(&self) -> u64 {
        self.config.tick_interval_secs
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn is_asset_supported(&self, asset: &AssetClass) -> bool {
        self.supported_assets.read().contains(asset)
    }

    pub fn pool_available(&self) -> Quantity {
        self.pool.available()
    }

    pub fn pool_ledger(&self) -> PoolLedger {
        self.pool.ledger()
    }

    /// Number of positions not yet redeemed.
    pub fn live_positions(&self) -> usize {
        self.registry.len()
    }

    /// Snapshots of every live position, in lockup id order.
    pub async fn positions(&self) -> Vec<PositionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.registry.len());
        for (_, handle) in self.registry.handles() {
            let position = handle.lock().await;
            if position.phase() != PositionPhase::Redeemed {
                snapshots.push(position.snapshot());
            }
        }
        snapshots
    }

    pub(crate) fn position_handles(&self) -> Vec<(LockupId, PositionHandle)> {
        self.registry.handles()
    }

    /// Escrow `amount` from `party` in exchange for a new capability token.
    pub async fn lock(
        &self,
        party: &AccountId,
        amount: Amount,
        args: LockArgs,
    ) -> Result<LockReceipt, LockupError> {
        self.lock_inner(party, amount, args)
            .await
            .inspect_err(|e| warn!(%party, error = %e, "lock rejected"))
    }

    async fn lock_inner(
        &self,
        party: &AccountId,
        amount: Amount,
        args: LockArgs,
    ) -> Result<LockReceipt, LockupError> {
        if amount.is_zero() {
            return Err(ValidationError::ZeroQuantity.into());
        }
        if !self.is_asset_supported(&amount.asset) {
            return Err(ValidationError::UnsupportedAsset(amount.asset).into());
        }
        let bonding_period = match self.config.lockup_strategy {
            LockupStrategy::TimedLockup => {
                let days = args.bonding_period.ok_or(ValidationError::MissingBondingPeriod)?;
                if !is_valid_period(days) {
                    return Err(ValidationError::InvalidPeriod(days).into());
                }
                Some(days)
            }
            LockupStrategy::UnlockOnDemand => None,
        };

        let now = self.clock.now().await;
        let lockup_id = self.registry.allocate_id();
        let payload = TokenPayload {
            lockup_id,
            amount_locked_in: amount.clone(),
            locking_timestamp: now,
            bonding_period,
            unbonding_period: None,
            unbonding_timestamp: None,
        };
        let settled = self
            .settlement
            .settle(Reallocation::new(party.clone()).give(amount.clone()).mint(payload))
            .await?;
        let token = minted(settled)?;

        let (publication, subscription) = notifier::channel();
        self.registry.insert(Position::new(&token, publication));
        info!(
            %lockup_id,
            %party,
            quantity = amount.quantity,
            asset = %amount.asset,
            bonding_period = ?bonding_period,
            "tokens locked"
        );
        Ok(LockReceipt {
            message: "Succeeded. Tokens locked.".into(),
            token,
            subscription,
        })
    }

    /// Start unbonding an unlock-on-demand position.
    ///
    /// Burns `token`, mints its replacement and swaps the notification
    /// channel. Without `unbonding_period` the configured default is used.
    pub async fn unlock(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        unbonding_period: Option<f64>,
    ) -> Result<UnlockReceipt, LockupError> {
        self.unlock_inner(party, token, unbonding_period)
            .await
            .inspect_err(|e| warn!(lockup_id = %token.lockup_id(), error = %e, "unlock rejected"))
    }

    async fn unlock_inner(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        unbonding_period: Option<f64>,
    ) -> Result<UnlockReceipt, LockupError> {
        if !self.config.lockup_strategy.supports_unlock() {
            return Err(PreconditionError::UnlockNotSupported.into());
        }
        let period = unbonding_period.unwrap_or(self.config.default_unbonding_period_days);
        if !is_valid_period(period) {
            return Err(ValidationError::InvalidPeriod(period).into());
        }

        let mut position = self.resolve(token).await?;
        position.ensure_unlockable()?;
        let now = self.clock.now().await;
        let payload = position.unbonding_payload(now, period);
        let settled = self
            .settlement
            .settle(Reallocation::new(party.clone()).burn(token.serial()).mint(payload))
            .await?;
        let next = minted(settled)?;

        let (publication, subscription) = notifier::channel();
        let previous = position.begin_unbonding(now, period, &next, publication);
        if let Err(e) = previous.finish("Unbonding has started", Some(now)) {
            warn!(lockup_id = %token.lockup_id(), error = %e, "could not finish previous channel");
        }
        info!(lockup_id = %token.lockup_id(), unbonding_period = period, "unbonding started");
        Ok(UnlockReceipt {
            message: "Unlock operation succeeded".into(),
            token: next,
            subscription,
        })
    }

    /// Return the locked amount in exchange for the token.
    ///
    /// `want` must equal the locked amount exactly. Every claimable reward
    /// must be withdrawn first.
    pub async fn redeem(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        want: Amount,
    ) -> Result<RedeemReceipt, LockupError> {
        self.redeem_inner(party, token, want)
            .await
            .inspect_err(|e| warn!(lockup_id = %token.lockup_id(), error = %e, "redeem rejected"))
    }

    async fn redeem_inner(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        want: Amount,
    ) -> Result<RedeemReceipt, LockupError> {
        let mut position = self.resolve(token).await?;
        if &want != position.amount_locked_in() {
            return Err(ValidationError::RedeemMismatch {
                requested: want,
                locked: position.amount_locked_in().clone(),
            }
            .into());
        }
        let now = self.clock.now().await;
        position.ensure_redeemable(now)?;
        match position.check_state(now, &self.config.evaluator) {
            Ok(state) if state.rewards_to_collect > 0 => {
                return Err(PreconditionError::OutstandingRewards {
                    outstanding: state.rewards_to_collect,
                }
                .into());
            }
            Ok(_) => {}
            // An unevaluable reward must not hold the principal hostage.
            Err(e) => warn!(
                lockup_id = %token.lockup_id(),
                error = %e,
                "reward cannot be evaluated, redeeming without it"
            ),
        }

        let returned = position.amount_locked_in().clone();
        self.settlement
            .settle(
                Reallocation::new(party.clone())
                    .burn(token.serial())
                    .take(returned.clone()),
            )
            .await?;

        position.mark_redeemed();
        if let Err(e) = position.publication().finish("Tokens redeemed", None) {
            warn!(lockup_id = %token.lockup_id(), error = %e, "could not finish channel");
        }
        self.registry.remove(token.lockup_id());
        info!(
            lockup_id = %token.lockup_id(),
            %party,
            quantity = returned.quantity,
            asset = %returned.asset,
            "tokens redeemed"
        );
        Ok(RedeemReceipt {
            message: "Tokens redeemed".into(),
            returned,
        })
    }

    /// Pay out up to `want` of the claimable reward. The token stays valid.
    ///
    /// The payout is `min(want, available)`: an empty pool yields a successful
    /// zero payout and settles nothing.
    pub async fn withdraw_rewards(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        want: Amount,
    ) -> Result<WithdrawReceipt, LockupError> {
        self.withdraw_inner(party, token, want)
            .await
            .inspect_err(|e| warn!(lockup_id = %token.lockup_id(), error = %e, "withdraw rejected"))
    }

    async fn withdraw_inner(
        &self,
        party: &AccountId,
        token: &CapabilityToken,
        want: Amount,
    ) -> Result<WithdrawReceipt, LockupError> {
        self.ensure_reward_asset(&want.asset)?;
        let mut position = self.resolve(token).await?;
        let now = self.clock.now().await;
        let state = position.check_state(now, &self.config.evaluator)?;
        if want.quantity > state.rewards_to_collect {
            return Err(PreconditionError::ExceedsClaimable {
                requested: want.quantity,
                claimable: state.rewards_to_collect,
            }
            .into());
        }

        let reservation = self.pool.reserve(want.quantity);
        let payout = Amount::new(self.config.reward_asset.clone(), reservation.amount());
        if payout.is_zero() {
            if want.quantity > 0 {
                warn!(lockup_id = %token.lockup_id(), requested = want.quantity, "reward pool is empty");
            }
        } else {
            // Dropping the reservation on failure puts the amount back.
            self.settlement
                .settle(Reallocation::new(party.clone()).take(payout.clone()))
                .await?;
        }
        let paid = reservation.commit();
        position.record_collection(paid);

        info!(
            lockup_id = %token.lockup_id(),
            %party,
            requested = want.quantity,
            paid,
            collected = position.rewards_collected(),
            "rewards withdrawn"
        );
        Ok(WithdrawReceipt {
            message: format!("Successfully collected {paid} reward tokens"),
            payout,
            token: token.clone(),
        })
    }

    /// Current state of the position `token` names.
    pub async fn check_state(&self, token: &CapabilityToken) -> Result<LockupState, LockupError> {
        let mut position = self.resolve(token).await?;
        let now = self.clock.now().await;
        let state = position.check_state(now, &self.config.evaluator)?;
        debug!(lockup_id = %token.lockup_id(), rewards = state.rewards_to_collect, expired = state.expired, "state queried");
        Ok(state)
    }

    /// A fresh subscription to the position's current channel.
    pub async fn subscribe(&self, token: &CapabilityToken) -> Result<Subscription, LockupError> {
        let position = self.resolve(token).await?;
        Ok(position.publication().subscribe())
    }

    /// Lock the position `token` names and check the token is its live credential.
    async fn resolve(
        &self,
        token: &CapabilityToken,
    ) -> Result<OwnedMutexGuard<Position>, LockupError> {
        let handle = self.registry.get(token.lockup_id())?;
        let position = handle.lock_owned().await;
        position.authorize(token)?;
        if !self.settlement.is_live(token.serial()) {
            return Err(NotFoundError::StaleToken(token.serial()).into());
        }
        Ok(position)
    }

    fn ensure_reward_asset(&self, asset: &AssetClass) -> Result<(), ValidationError> {
        if asset != &self.config.reward_asset {
            return Err(ValidationError::WrongRewardAsset {
                got: asset.clone(),
                expected: self.config.reward_asset.clone(),
            });
        }
        Ok(())
    }
}

impl OperatorFacet {
    pub fn engine(&self) -> &Arc<LockupEngine> {
        &self.engine
    }

    /// Escrow reward-asset liquidity from `party` and add it to the pool.
    ///
    /// Returns the pool's new available balance.
    pub async fn add_reward_liquidity(
        &self,
        party: &AccountId,
        amount: Amount,
    ) -> Result<Quantity, LockupError> {
        let engine = &self.engine;
        engine.ensure_reward_asset(&amount.asset)?;
        if amount.is_zero() {
            return Err(ValidationError::ZeroQuantity.into());
        }
        engine.pool.ensure_fundable(amount.quantity)?;
        engine
            .settlement
            .settle(Reallocation::new(party.clone()).give(amount.clone()))
            .await?;
        let available = engine.pool.fund(amount.quantity)?;
        info!(%party, quantity = amount.quantity, available, "reward liquidity added");
        Ok(available)
    }

    /// Accept `asset` for locking from now on.
    pub fn add_supported_asset(&self, asset: AssetClass) -> Result<(), LockupError> {
        if asset == self.engine.config.reward_asset {
            return Err(ValidationError::RewardAssetNotLockable(asset).into());
        }
        let mut supported = self.engine.supported_assets.write();
        if supported.contains(&asset) {
            return Err(ValidationError::AssetAlreadySupported(asset).into());
        }
        info!(%asset, "supported asset added");
        supported.insert(asset);
        Ok(())
    }
}

fn minted(settled: Settled) -> Result<CapabilityToken, SettlementError> {
    settled
        .minted
        .ok_or_else(|| SettlementError::Rejected("settlement did not mint a token".into()))
}
