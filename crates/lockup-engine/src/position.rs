//! Per-lockup time state machine.
//!
//! A position moves `Bonding | Open → Unbonding → Redeemed` and never back.
//! Timed lockups start in `Bonding` (bonding period fixed at lock time);
//! unlock-on-demand lockups start `Open` and enter `Unbonding` when the
//! holder unlocks. At most one of the bonding and unbonding periods is ever
//! set.
//!
//! The position owns the authoritative state. Capability tokens only name it.

use serde::Serialize;

use lockup_core::error::{NotFoundError, PreconditionError, RewardError};
use lockup_core::time::{cutover, seconds_to_days};
use lockup_core::traits::RewardCalculator;
use lockup_core::types::{
    Amount, CapabilityToken, LockupId, LockupState, Quantity, TimeLockInfo, Timestamp,
    TokenPayload, TokenSerial,
};

use crate::notifier::Publication;

/// Lifecycle phase of a position.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionPhase {
    /// Timed lockup, bonding period fixed.
    Bonding,
    /// Unlock-on-demand lockup, not yet unlocked.
    Open,
    Unbonding,
    Redeemed,
}

/// Read-only view of a position.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub lockup_id: LockupId,
    pub phase: PositionPhase,
    pub amount_locked_in: Amount,
    pub locking_timestamp: Timestamp,
    pub bonding_period: Option<f64>,
    pub unbonding_period: Option<f64>,
    pub unbonding_timestamp: Option<Timestamp>,
    pub rewards_collected: Quantity,
    pub expired: bool,
}

#[derive(Debug)]
pub struct Position {
    lockup_id: LockupId,
    amount_locked_in: Amount,
    bonding_period: Option<f64>,
    unbonding_period: Option<f64>,
    locking_timestamp: Timestamp,
    unbonding_timestamp: Option<Timestamp>,
    rewards_collected: Quantity,
    /// Cached for display; recomputed on every state query.
    expired: bool,
    expiry_announced: bool,
    redeemed: bool,
    token_serial: TokenSerial,
    publication: Publication,
}

impl Position {
    /// A freshly locked position, authorized by the token minted for it.
    pub fn new(token: &CapabilityToken, publication: Publication) -> Self {
        let payload = token.payload();
        Self {
            lockup_id: payload.lockup_id,
            amount_locked_in: payload.amount_locked_in.clone(),
            bonding_period: payload.bonding_period,
            unbonding_period: None,
            locking_timestamp: payload.locking_timestamp,
            unbonding_timestamp: None,
            rewards_collected: 0,
            expired: false,
            expiry_announced: false,
            redeemed: false,
            token_serial: token.serial(),
            publication,
        }
    }

    pub fn lockup_id(&self) -> LockupId {
        self.lockup_id
    }

    pub fn amount_locked_in(&self) -> &Amount {
        &self.amount_locked_in
    }

    pub fn rewards_collected(&self) -> Quantity {
        self.rewards_collected
    }

    pub fn token_serial(&self) -> TokenSerial {
        self.token_serial
    }

    pub fn publication(&self) -> &Publication {
        &self.publication
    }

    pub fn phase(&self) -> PositionPhase {
        if self.redeemed {
            PositionPhase::Redeemed
        } else if self.unbonding_timestamp.is_some() {
            PositionPhase::Unbonding
        } else if self.bonding_period.is_some() {
            PositionPhase::Bonding
        } else {
            PositionPhase::Open
        }
    }

    /// Check that `token` is the live credential for this position.
    pub fn authorize(&self, token: &CapabilityToken) -> Result<(), NotFoundError> {
        if self.redeemed {
            return Err(NotFoundError::Lockup(self.lockup_id));
        }
        if token.lockup_id() != self.lockup_id || token.serial() != self.token_serial {
            return Err(NotFoundError::StaleToken(token.serial()));
        }
        Ok(())
    }

    /// Days locked in as of `now`, and whether the governing period passed.
    ///
    /// Time stops counting at the end of the unbonding period, or of the
    /// bonding period for timed lockups. Open positions keep counting.
    pub fn time_lock_information(&self, now: Timestamp) -> TimeLockInfo {
        let governing = match (self.unbonding_timestamp, self.unbonding_period) {
            (Some(start), Some(days)) => Some(cutover(start, days)),
            _ => self.bonding_period.map(|days| cutover(self.locking_timestamp, days)),
        };
        let now = now as f64;
        let (most_recent, has_passed) = match governing {
            Some(end) if end < now => (end, true),
            _ => (now, false),
        };
        TimeLockInfo {
            time_locked_in_days: seconds_to_days(most_recent - self.locking_timestamp as f64),
            has_passed,
        }
    }

    /// Claimable reward as of `now`. Updates the cached `expired` flag.
    pub fn check_state(
        &mut self,
        now: Timestamp,
        calculator: &dyn RewardCalculator,
    ) -> Result<LockupState, RewardError> {
        let info = self.time_lock_information(now);
        let claimable = calculator.claimable(
            self.amount_locked_in.quantity,
            info.time_locked_in_days,
            self.rewards_collected,
        )?;
        self.expired = info.has_passed;

        let mut message = format!("You currently have {claimable} reward tokens to collect.");
        if info.has_passed {
            message.push_str(" Your token lockup has expired, no more rewards will be generated.");
        }
        Ok(LockupState {
            expired: info.has_passed,
            rewards_to_collect: claimable,
            message,
        })
    }

    /// Instant from which redemption is allowed.
    pub fn redeemable_from(&self) -> Result<f64, PreconditionError> {
        match (self.unbonding_timestamp, self.unbonding_period, self.bonding_period) {
            (Some(start), Some(days), _) => Ok(cutover(start, days)),
            (_, _, Some(days)) => Ok(cutover(self.locking_timestamp, days)),
            _ => Err(PreconditionError::NotUnlocked(self.lockup_id)),
        }
    }

    /// Fail unless redemption is open at `now`.
    pub fn ensure_redeemable(&self, now: Timestamp) -> Result<(), PreconditionError> {
        let from = self.redeemable_from()?;
        if (now as f64) >= from {
            return Ok(());
        }
        if self.unbonding_timestamp.is_some() {
            Err(PreconditionError::UnbondingNotElapsed { until: from })
        } else {
            Err(PreconditionError::BondingNotElapsed { until: from })
        }
    }

    /// Fail unless this position can start unbonding.
    pub fn ensure_unlockable(&self) -> Result<(), PreconditionError> {
        match self.phase() {
            PositionPhase::Open => Ok(()),
            PositionPhase::Bonding => Err(PreconditionError::UnlockNotSupported),
            PositionPhase::Unbonding | PositionPhase::Redeemed => {
                Err(PreconditionError::AlreadyUnbonding(self.lockup_id))
            }
        }
    }

    /// Payload for the token minted when unbonding starts at `now`.
    pub fn unbonding_payload(&self, now: Timestamp, unbonding_period: f64) -> TokenPayload {
        TokenPayload {
            lockup_id: self.lockup_id,
            amount_locked_in: self.amount_locked_in.clone(),
            locking_timestamp: self.locking_timestamp,
            bonding_period: None,
            unbonding_period: Some(unbonding_period),
            unbonding_timestamp: Some(now),
        }
    }

    /// Enter `Unbonding`, switching to the new token and channel.
    ///
    /// Returns the channel that was replaced; the caller finishes it.
    pub fn begin_unbonding(
        &mut self,
        now: Timestamp,
        unbonding_period: f64,
        token: &CapabilityToken,
        publication: Publication,
    ) -> Publication {
        self.unbonding_timestamp = Some(now);
        self.unbonding_period = Some(unbonding_period);
        self.token_serial = token.serial();
        self.expiry_announced = false;
        std::mem::replace(&mut self.publication, publication)
    }

    pub fn record_collection(&mut self, payout: Quantity) {
        self.rewards_collected = self.rewards_collected.saturating_add(payout);
    }

    /// Whether an expiry notice still has to go out. Marks it as sent.
    pub fn take_expiry_notice(&mut self) -> bool {
        if self.expired && !self.expiry_announced {
            self.expiry_announced = true;
            true
        } else {
            false
        }
    }

    pub fn mark_redeemed(&mut self) {
        self.redeemed = true;
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            lockup_id: self.lockup_id,
            phase: self.phase(),
            amount_locked_in: self.amount_locked_in.clone(),
            locking_timestamp: self.locking_timestamp,
            bonding_period: self.bonding_period,
            unbonding_period: self.unbonding_period,
            unbonding_timestamp: self.unbonding_timestamp,
            rewards_collected: self.rewards_collected,
            expired: self.expired,
        }
    }
}
