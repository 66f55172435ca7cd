//! # lockup-core
//! Foundation types and traits for the lockup engine.
//!
//! Everything here is shared between the reward evaluator
//! (`lockup-rewards`) and the position engine (`lockup-engine`):
//! - [`types`] — assets, amounts, lockup ids, capability tokens
//! - [`error`] — the error taxonomy (configuration, validation,
//!   precondition, not-found) plus boundary errors
//! - [`time`] — day/second conversions used by every state query
//! - [`traits`] — the reward calculator, settlement facility and clock seams

pub mod constants;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;
