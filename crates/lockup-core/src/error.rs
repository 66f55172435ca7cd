//! Error types for the lockup engine.
//!
//! [`ConfigurationError`] is the only fatal class: it is raised once, when an
//! engine is started, and prevents it from becoming usable. Every other class
//! is local to the failing call and leaves all state untouched.
use thiserror::Error;

use crate::types::{Amount, AssetClass, LockupId, Quantity, TokenSerial};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("tiered reward strategy needs at least one tier")] EmptyTiers,
    #[error("tier {index} is malformed: {reason}")] MalformedTier { index: usize, reason: String },
    #[error("invalid reward strategy parameter {name}: {value}")] InvalidParameter { name: &'static str, value: f64 },
    #[error("the tiered reward strategy is not supported with the unlock-on-demand lockup strategy")] TieredWithUnlock,
    #[error("no supported asset classes configured")] NoSupportedAssets,
    #[error("reward asset {0} cannot also be a lockable asset")] RewardAssetLockable(AssetClass),
    #[error("tick interval must be positive")] ZeroTickInterval,
    #[error("invalid default unbonding period: {0}")] InvalidDefaultUnbonding(f64),
    #[error("failed to load configuration: {0}")] Load(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("asset class {0} is not supported")] UnsupportedAsset(AssetClass),
    #[error("asset class {0} is already supported")] AssetAlreadySupported(AssetClass),
    #[error("reward asset {0} cannot be accepted for locking")] RewardAssetNotLockable(AssetClass),
    #[error("timed lockups require a bonding period")] MissingBondingPeriod,
    #[error("invalid period: {0} days")] InvalidPeriod(f64),
    #[error("cannot lock a zero quantity")] ZeroQuantity,
    #[error("requested {requested} does not match the locked amount {locked}")] RedeemMismatch { requested: Amount, locked: Amount },
    #[error("asset class {got} is not the reward asset {expected}")] WrongRewardAsset { got: AssetClass, expected: AssetClass },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("still in the bonding period until {until}")] BondingNotElapsed { until: f64 },
    #[error("still in the unbonding period until {until}")] UnbondingNotElapsed { until: f64 },
    #[error("collect the outstanding {outstanding} rewards before redeeming")] OutstandingRewards { outstanding: Quantity },
    #[error("requested {requested} rewards but only {claimable} are claimable")] ExceedsClaimable { requested: Quantity, claimable: Quantity },
    #[error("the configured lockup strategy does not support unlock")] UnlockNotSupported,
    #[error("lockup {0} is already unbonding")] AlreadyUnbonding(LockupId),
    #[error("lockup {0} must be unlocked before it can be redeemed")] NotUnlocked(LockupId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("lockup not found: {0}")] Lockup(LockupId),
    #[error("token {0} is not live")] StaleToken(TokenSerial),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("insufficient {asset} for {account}: have {have}, need {need}")] InsufficientBalance { account: String, asset: AssetClass, have: Quantity, need: Quantity },
    #[error("unknown token: {0}")] UnknownToken(TokenSerial),
    #[error("balance overflow")] Overflow,
    #[error("settlement rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewardError {
    #[error("reward evaluated to a non-finite value: {0}")] NonFinite(f64),
    #[error("arithmetic overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("notification channel already finished")] Finished,
    #[error("notification channel closed")] Closed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockupError {
    #[error(transparent)] Configuration(#[from] ConfigurationError),
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] Precondition(#[from] PreconditionError),
    #[error(transparent)] NotFound(#[from] NotFoundError),
    #[error(transparent)] Settlement(#[from] SettlementError),
    #[error(transparent)] Reward(#[from] RewardError),
    #[error(transparent)] Channel(#[from] ChannelError),
}

impl LockupError {
    /// Whether the caller can recover by resubmitting with corrected arguments.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}
