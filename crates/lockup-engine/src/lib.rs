//! # lockup-engine
//!
//! Lockup position lifecycle and its supporting state.
//!
//! - [`engine::LockupEngine`] — lock, unlock, redeem and reward withdrawal
//! - [`engine::OperatorFacet`] — reward funding and asset allow-list
//! - [`position::Position`] — per-lockup time state machine
//! - [`registry::Registry`] — lockup id to position table
//! - [`pool::RewardPool`] — operator-funded reward liquidity
//! - [`notifier`] — per-position notification channels
//! - [`fanout`] — clock-driven state republishing
//! - [`settlement::LedgerSettlement`] — in-memory settlement facility
//! - [`clock`] — manual and wall clocks
//! - [`config::EngineConfig`] — engine configuration

pub mod clock;
pub mod config;
pub mod engine;
pub mod fanout;
pub mod notifier;
pub mod pool;
pub mod position;
pub mod registry;
pub mod settlement;

pub use config::EngineConfig;
pub use engine::{LockReceipt, LockupEngine, OperatorFacet, RedeemReceipt, UnlockReceipt, WithdrawReceipt};
pub use notifier::{Notification, Publication, Subscription};
