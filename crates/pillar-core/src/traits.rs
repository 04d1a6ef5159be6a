//! Collaborator interfaces consumed by the ledger engine.
//!
//! - [`ValueTransfer`] — moves the fungible unit in and out of the ledger
//! - [`Clock`] — reports wall-clock time
//!
//! In-memory implementations live in [`crate::transfer`] and [`crate::clock`].

use crate::address::Address;
use crate::error::TransferError;

/// Movement of value between accounts and the ledger's custody.
///
/// Both calls either move exactly `amount` or fail without moving anything.
pub trait ValueTransfer: Send + Sync {
    /// Transfer `amount` from `from` into the ledger.
    fn pull(&self, from: &Address, amount: u128) -> Result<(), TransferError>;

    /// Transfer `amount` from the ledger to `to`.
    fn push(&self, to: &Address, amount: u128) -> Result<(), TransferError>;
}

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for &T {
    fn pull(&self, from: &Address, amount: u128) -> Result<(), TransferError> {
        (**self).pull(from, amount)
    }

    fn push(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        (**self).push(to, amount)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
