//! Integration test suite for the lockup engine.
//!
//! Tests drive a real engine over the in-memory settlement ledger and a
//! manual clock, covering whole lifecycles, racing operations on the same
//! position and randomized operation sequences.

pub mod helpers;
