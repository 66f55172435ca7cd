//! Core lockup types: assets, amounts, identifiers, capability tokens.
//!
//! Quantities are non-negative integers in the smallest unit of their asset
//! class. Periods are fractional days, timestamps are whole seconds of the
//! external clock.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Quantity of a fungible asset, in its smallest unit.
pub type Quantity = u128;

/// Seconds since the epoch of the external clock.
pub type Timestamp = u64;

/// A class of fungible asset (what the ledger calls a brand).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssetClass(String);

impl AssetClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A participant holding balances at the settlement facility.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A quantity of one asset class.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Amount {
    pub asset: AssetClass,
    pub quantity: Quantity,
}

impl Amount {
    pub fn new(asset: impl Into<AssetClass>, quantity: Quantity) -> Self {
        Self {
            asset: asset.into(),
            quantity,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.quantity == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.asset)
    }
}

/// Identifier of a lockup position.
///
/// Assigned from a monotonically increasing counter when the position is
/// created and serialized as a decimal string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockupId(u64);

impl LockupId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LockupId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl Serialize for LockupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LockupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serial number of a minted capability token.
///
/// Only serials currently live at the settlement facility authorize anything.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenSerial(pub u64);

impl fmt::Display for TokenSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Data snapshotted into a capability token when it is minted.
///
/// Display and debugging only: every state query re-reads the position
/// from the registry by `lockup_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TokenPayload {
    pub lockup_id: LockupId,
    pub amount_locked_in: Amount,
    pub locking_timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonding_period: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unbonding_period: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unbonding_timestamp: Option<Timestamp>,
}

/// Transferable credential authorizing operations on one lockup position.
///
/// Minted by the settlement facility. Holding a token whose serial is no
/// longer live (burned on unlock or redeem) authorizes nothing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CapabilityToken {
    serial: TokenSerial,
    payload: TokenPayload,
}

impl CapabilityToken {
    /// Used by settlement facilities when minting.
    pub fn new(serial: TokenSerial, payload: TokenPayload) -> Self {
        Self { serial, payload }
    }

    pub fn serial(&self) -> TokenSerial {
        self.serial
    }

    pub fn lockup_id(&self) -> LockupId {
        self.payload.lockup_id
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }
}

/// How positions become redeemable. Chosen once per engine.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockupStrategy {
    /// A bonding period is fixed at lock time; redemption opens once it elapses.
    #[default]
    TimedLockup,
    /// Open-ended until the holder calls unlock; redemption opens once the
    /// unbonding period chosen at unlock elapses.
    UnlockOnDemand,
}

impl LockupStrategy {
    pub fn supports_unlock(&self) -> bool {
        matches!(self, Self::UnlockOnDemand)
    }
}

/// Arguments supplied with a lock request.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct LockArgs {
    /// Bonding period in days. Required under [`LockupStrategy::TimedLockup`].
    #[serde(default)]
    pub bonding_period: Option<f64>,
}

impl LockArgs {
    pub fn bonding(days: f64) -> Self {
        Self {
            bonding_period: Some(days),
        }
    }
}

/// Elapsed lock-in time and whether the governing period has passed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TimeLockInfo {
    pub time_locked_in_days: f64,
    pub has_passed: bool,
}

/// Result of a state query against one position.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LockupState {
    pub expired: bool,
    pub rewards_to_collect: Quantity,
    pub message: String,
}

/// One atomic unit of work for the settlement facility.
///
/// `give` moves from the party to the engine escrow, `take` moves from the
/// escrow to the party. The optional burn and mint happen in the same unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Reallocation {
    pub party: AccountId,
    pub give: Vec<Amount>,
    pub take: Vec<Amount>,
    pub burn: Option<TokenSerial>,
    pub mint: Option<TokenPayload>,
}

impl Reallocation {
    pub fn new(party: AccountId) -> Self {
        Self {
            party,
            give: Vec::new(),
            take: Vec::new(),
            burn: None,
            mint: None,
        }
    }

    pub fn give(mut self, amount: Amount) -> Self {
        self.give.push(amount);
        self
    }

    pub fn take(mut self, amount: Amount) -> Self {
        self.take.push(amount);
        self
    }

    pub fn burn(mut self, serial: TokenSerial) -> Self {
        self.burn = Some(serial);
        self
    }

    pub fn mint(mut self, payload: TokenPayload) -> Self {
        self.mint = Some(payload);
        self
    }
}

/// Outcome of a successful [`Reallocation`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settled {
    pub minted: Option<CapabilityToken>,
}
