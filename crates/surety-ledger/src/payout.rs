//! Payout rail - the external value transfer used by withdrawals
//!
//! The ledger commits its own bookkeeping before calling
//! [`PayoutRail::transfer`] and reverses it if the transfer fails. A rail only
//! ever sees the recipient and the amount, never the ledger itself, so it
//! cannot call back into a withdrawal in progress.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use surety_common::AccountId;
use thiserror::Error;

/// Failed external transfer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransferError {
    #[error("Recipient {0} rejected the transfer")]
    Rejected(AccountId),

    #[error("Transfer rail unavailable: {0}")]
    Unavailable(String),
}

/// Destination for passenger payouts
pub trait PayoutRail: Send {
    fn transfer(&mut self, to: &AccountId, amount: Decimal) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct RailState {
    received: HashMap<AccountId, Decimal>,
    rejecting: HashSet<AccountId>,
}

/// In-memory rail whose balances can be inspected through any clone
///
/// Stands in for the transport layer when the engine runs in-process.
#[derive(Debug, Clone, Default)]
pub struct SharedRail {
    state: Arc<Mutex<RailState>>,
}

impl SharedRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total received by `account`
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.state
            .lock()
            .received
            .get(account)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Make transfers to `account` fail until [`accept`](Self::accept) is called
    pub fn reject(&self, account: AccountId) {
        self.state.lock().rejecting.insert(account);
    }

    pub fn accept(&self, account: &AccountId) {
        self.state.lock().rejecting.remove(account);
    }
}

impl PayoutRail for SharedRail {
    fn transfer(&mut self, to: &AccountId, amount: Decimal) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.rejecting.contains(to) {
            return Err(TransferError::Rejected(*to));
        }
        *state.received.entry(*to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}
