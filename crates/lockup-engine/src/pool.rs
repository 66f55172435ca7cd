//! Global reward pool accounting.
//!
//! The pool tracks operator-funded reward liquidity. Withdrawals first
//! reserve a payout (capped at what is available), settle it with the
//! settlement facility, then commit it as disbursed. A reservation that is
//! dropped without being committed returns its amount to the pool, so a
//! failed or cancelled withdrawal leaves the ledger as it was.
//!
//! Invariant: `funded == available + reserved + disbursed`; with no withdrawal
//! in flight `reserved == 0` and `funded - disbursed == available`.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use lockup_core::error::RewardError;
use lockup_core::types::Quantity;

/// Snapshot of the pool's books.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolLedger {
    pub funded: Quantity,
    pub disbursed: Quantity,
    pub reserved: Quantity,
    pub available: Quantity,
}

/// Operator-funded reward liquidity shared by every position.
#[derive(Debug)]
pub struct RewardPool {
    ledger: Mutex<PoolLedger>,
    low_watermark: Quantity,
}

impl RewardPool {
    /// An empty pool that warns when `available` drops below `low_watermark`.
    pub fn new(low_watermark: Quantity) -> Self {
        Self {
            ledger: Mutex::new(PoolLedger::default()),
            low_watermark,
        }
    }

    /// Add funded liquidity. Returns the new available balance.
    pub fn fund(&self, quantity: Quantity) -> Result<Quantity, RewardError> {
        let mut ledger = self.ledger.lock();
        let funded = ledger.funded.checked_add(quantity).ok_or(RewardError::Overflow)?;
        let available = ledger.available.checked_add(quantity).ok_or(RewardError::Overflow)?;
        ledger.funded = funded;
        ledger.available = available;
        debug!(quantity, available, "reward pool funded");
        Ok(available)
    }

    /// Fail if funding `quantity` would overflow the books.
    pub fn ensure_fundable(&self, quantity: Quantity) -> Result<(), RewardError> {
        let ledger = self.ledger.lock();
        ledger.funded.checked_add(quantity).ok_or(RewardError::Overflow)?;
        ledger.available.checked_add(quantity).ok_or(RewardError::Overflow)?;
        Ok(())
    }

    /// Reserve up to `requested` from the available balance.
    ///
    /// The reserved amount is `min(requested, available)`, possibly zero.
    pub fn reserve(&self, requested: Quantity) -> PoolReservation<'_> {
        let mut ledger = self.ledger.lock();
        let amount = requested.min(ledger.available);
        ledger.available -= amount;
        ledger.reserved += amount;
        PoolReservation {
            pool: self,
            amount,
            committed: false,
        }
    }

    pub fn available(&self) -> Quantity {
        self.ledger.lock().available
    }

    pub fn ledger(&self) -> PoolLedger {
        *self.ledger.lock()
    }

    fn commit(&self, amount: Quantity) {
        let available = {
            let mut ledger = self.ledger.lock();
            ledger.reserved -= amount;
            ledger.disbursed += amount;
            ledger.available
        };
        if available < self.low_watermark {
            warn!(
                available,
                threshold = self.low_watermark,
                "reward pool liquidity is running low"
            );
        }
    }

    fn release(&self, amount: Quantity) {
        let mut ledger = self.ledger.lock();
        ledger.reserved -= amount;
        ledger.available += amount;
    }
}

/// An in-flight payout held out of the available balance.
#[derive(Debug)]
#[must_use = "a reservation is released when dropped"]
pub struct PoolReservation<'a> {
    pool: &'a RewardPool,
    amount: Quantity,
    committed: bool,
}

impl PoolReservation<'_> {
    pub fn amount(&self) -> Quantity {
        self.amount
    }

    /// Record the reserved amount as disbursed.
    pub fn commit(mut self) -> Quantity {
        self.committed = true;
        self.pool.commit(self.amount);
        self.amount
    }
}

impl Drop for PoolReservation<'_> {
    fn drop(&mut self) {
        if !self.committed && self.amount > 0 {
            self.pool.release(self.amount);
        }
    }
}
