//! In-memory value transfer for tests and simulation.
//!
//! [`MemoryTransfer`] keeps a balance per external address plus the
//! ledger's own custody balance. Clones share state, so a test can hand one
//! clone to the ledger and inspect balances through another.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::address::Address;
use crate::error::TransferError;
use crate::traits::ValueTransfer;

#[derive(Debug, Default)]
struct Balances {
    wallets: HashMap<Address, u128>,
    custody: u128,
    frozen: HashSet<Address>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTransfer {
    inner: Arc<Mutex<Balances>>,
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` from outside the system.
    pub fn mint(&self, account: &Address, amount: u128) {
        let mut inner = self.inner.lock();
        let balance = inner.wallets.entry(*account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.inner.lock().wallets.get(account).copied().unwrap_or(0)
    }

    /// Value currently held by the ledger.
    pub fn custody(&self) -> u128 {
        self.inner.lock().custody
    }

    /// Make every transfer touching `account` fail until [`thaw`](Self::thaw).
    pub fn freeze(&self, account: &Address) {
        self.inner.lock().frozen.insert(*account);
    }

    pub fn thaw(&self, account: &Address) {
        self.inner.lock().frozen.remove(account);
    }
}

impl ValueTransfer for MemoryTransfer {
    fn pull(&self, from: &Address, amount: u128) -> Result<(), TransferError> {
        let mut inner = self.inner.lock();
        if inner.frozen.contains(from) {
            return Err(TransferError::Rejected(*from));
        }
        let have = inner.wallets.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TransferError::InsufficientFunds { account: *from, have, need: amount });
        }
        inner.wallets.insert(*from, have - amount);
        inner.custody += amount;
        Ok(())
    }

    fn push(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        let mut inner = self.inner.lock();
        if inner.frozen.contains(to) {
            return Err(TransferError::Rejected(*to));
        }
        // Payouts may exceed deposited value; custody floors at zero.
        inner.custody = inner.custody.saturating_sub(amount);
        let balance = inner.wallets.entry(*to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}
