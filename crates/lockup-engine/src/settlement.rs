//! In-memory settlement facility.
//!
//! [`LedgerSettlement`] keeps per-account balances and the set of live
//! capability tokens behind one lock. A reallocation is checked in full
//! before anything is applied, so it either lands completely or not at all.
//! Token serials are random, so a live serial cannot be guessed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use lockup_core::constants::ESCROW_ACCOUNT;
use lockup_core::error::SettlementError;
use lockup_core::traits::SettlementFacility;
use lockup_core::types::{
    AccountId, Amount, AssetClass, CapabilityToken, Quantity, Reallocation, Settled,
    TokenPayload, TokenSerial,
};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(AccountId, AssetClass), Quantity>,
    live: HashMap<TokenSerial, TokenPayload>,
}

impl LedgerState {
    fn balance(&self, account: &AccountId, asset: &AssetClass) -> Quantity {
        self.balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct LedgerSettlement {
    escrow: AccountId,
    state: Mutex<LedgerState>,
    fail_next: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl Default for LedgerSettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerSettlement {
    pub fn new() -> Self {
        Self {
            escrow: AccountId::new(ESCROW_ACCOUNT),
            state: Mutex::new(LedgerState::default()),
            fail_next: AtomicBool::new(false),
            latency: Mutex::new(None),
        }
    }

    pub fn escrow(&self) -> &AccountId {
        &self.escrow
    }

    /// Credit `amount` to `account` out of thin air (asset issuance stand-in).
    pub fn credit(&self, account: &AccountId, amount: &Amount) -> Result<Quantity, SettlementError> {
        let mut state = self.state.lock();
        let entry = state
            .balances
            .entry((account.clone(), amount.asset.clone()))
            .or_insert(0);
        *entry = entry.checked_add(amount.quantity).ok_or(SettlementError::Overflow)?;
        Ok(*entry)
    }

    pub fn balance(&self, account: &AccountId, asset: &AssetClass) -> Quantity {
        self.state.lock().balance(account, asset)
    }

    pub fn escrow_balance(&self, asset: &AssetClass) -> Quantity {
        self.balance(&self.escrow, asset)
    }

    pub fn live_tokens(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Make the next `settle` call fail after its suspension point.
    pub fn fail_next_settlement(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Delay every settlement by `latency` before it is applied.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Check and apply a reallocation under the ledger lock.
    fn apply(&self, r: Reallocation) -> Result<Settled, SettlementError> {
        let mut state = self.state.lock();

        if let Some(serial) = r.burn {
            if !state.live.contains_key(&serial) {
                return Err(SettlementError::UnknownToken(serial));
            }
        }

        // Work on a copy of the touched balances; commit only if all moves fit.
        let mut touched: HashMap<(AccountId, AssetClass), Quantity> = HashMap::new();
        let moves = r
            .give
            .iter()
            .map(|a| (&r.party, &self.escrow, a))
            .chain(r.take.iter().map(|a| (&self.escrow, &r.party, a)));
        for (from, to, amount) in moves {
            let from_key = (from.clone(), amount.asset.clone());
            let have = match touched.get(&from_key) {
                Some(q) => *q,
                None => state.balance(from, &amount.asset),
            };
            let left = have
                .checked_sub(amount.quantity)
                .ok_or_else(|| SettlementError::InsufficientBalance {
                    account: from.to_string(),
                    asset: amount.asset.clone(),
                    have,
                    need: amount.quantity,
                })?;
            touched.insert(from_key, left);

            let to_key = (to.clone(), amount.asset.clone());
            let current = match touched.get(&to_key) {
                Some(q) => *q,
                None => state.balance(to, &amount.asset),
            };
            let credited = current
                .checked_add(amount.quantity)
                .ok_or(SettlementError::Overflow)?;
            touched.insert(to_key, credited);
        }

        state.balances.extend(touched);
        if let Some(serial) = r.burn {
            state.live.remove(&serial);
            trace!(%serial, "burned token");
        }
        let minted = r.mint.map(|payload| {
            let mut serial = TokenSerial(rand::random());
            while state.live.contains_key(&serial) {
                serial = TokenSerial(rand::random());
            }
            state.live.insert(serial, payload.clone());
            trace!(%serial, "minted token");
            CapabilityToken::new(serial, payload)
        });

        debug!(party = %r.party, gives = r.give.len(), takes = r.take.len(), "settled");
        Ok(Settled { minted })
    }
}

#[async_trait]
impl SettlementFacility for LedgerSettlement {
    async fn settle(&self, reallocation: Reallocation) -> Result<Settled, SettlementError> {
        let latency = *self.latency.lock();
        match latency {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SettlementError::Rejected("injected fault".into()));
        }
        self.apply(reallocation)
    }

    fn is_live(&self, serial: TokenSerial) -> bool {
        self.state.lock().live.contains_key(&serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockup_core::types::LockupId;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            lockup_id: LockupId::new(1),
            amount_locked_in: Amount::new("LP", 5),
            locking_timestamp: 0,
            bonding_period: None,
            unbonding_period: None,
            unbonding_timestamp: None,
        }
    }

    #[tokio::test]
    async fn give_and_mint() {
        let ledger = LedgerSettlement::new();
        ledger.credit(&alice(), &Amount::new("LP", 8)).unwrap();

        let settled = ledger
            .settle(Reallocation::new(alice()).give(Amount::new("LP", 5)).mint(payload()))
            .await
            .unwrap();

        let token = settled.minted.unwrap();
        assert!(ledger.is_live(token.serial()));
        assert_eq!(ledger.balance(&alice(), &"LP".into()), 3);
        assert_eq!(ledger.escrow_balance(&"LP".into()), 5);
    }

    #[tokio::test]
    async fn insufficient_balance_changes_nothing() {
        let ledger = LedgerSettlement::new();
        ledger.credit(&alice(), &Amount::new("LP", 2)).unwrap();

        let err = ledger
            .settle(Reallocation::new(alice()).give(Amount::new("LP", 5)).mint(payload()))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::InsufficientBalance { have: 2, need: 5, .. }));
        assert_eq!(ledger.balance(&alice(), &"LP".into()), 2);
        assert_eq!(ledger.live_tokens(), 0);
    }

    #[tokio::test]
    async fn take_fails_when_escrow_short() {
        let ledger = LedgerSettlement::new();
        let err = ledger
            .settle(Reallocation::new(alice()).take(Amount::new("GOV", 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn burn_requires_live_token() {
        let ledger = LedgerSettlement::new();
        let err = ledger
            .settle(Reallocation::new(alice()).burn(TokenSerial(99)))
            .await
            .unwrap_err();
        assert_eq!(err, SettlementError::UnknownToken(TokenSerial(99)));
    }

    #[tokio::test]
    async fn burn_and_mint_in_one_unit() {
        let ledger = LedgerSettlement::new();
        let first = ledger
            .settle(Reallocation::new(alice()).mint(payload()))
            .await
            .unwrap()
            .minted
            .unwrap();
        let second = ledger
            .settle(Reallocation::new(alice()).burn(first.serial()).mint(payload()))
            .await
            .unwrap()
            .minted
            .unwrap();
        assert!(!ledger.is_live(first.serial()));
        assert!(ledger.is_live(second.serial()));
        assert_eq!(ledger.live_tokens(), 1);
    }

    #[tokio::test]
    async fn injected_fault_fails_once() {
        let ledger = LedgerSettlement::new();
        ledger.fail_next_settlement();
        assert!(ledger.settle(Reallocation::new(alice())).await.is_err());
        assert!(ledger.settle(Reallocation::new(alice())).await.is_ok());
    }
}
