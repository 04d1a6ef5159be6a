//! Undo journal for all-or-nothing ledger operations.
//!
//! Before an operation mutates anything it opens a [`Journal`]. Accounts
//! are recorded the first time they are touched; the pool book, counters
//! and session are small and copied up front. [`Journal::rollback`]
//! restores all of it, including removing accounts the operation created.

use std::collections::HashMap;

use pillar_core::address::Address;
use pillar_core::clock::RoundClock;
use pillar_core::types::{CriteriaUpdateSession, GlobalState, InvestorAccount};

use crate::pool::PoolBook;
use crate::state::LedgerState;

/// State needed to revert one operation.
#[derive(Clone, Debug)]
struct StateUndo {
    /// Prior value of each touched account; `None` if it did not exist.
    accounts: HashMap<Address, Option<InvestorAccount>>,
    pools: PoolBook,
    global: GlobalState,
    session: CriteriaUpdateSession,
    registry_len: usize,
    deposit_fee_bp: u64,
    claim_fee_bp: u64,
}

pub(crate) struct Journal<'a> {
    pub(crate) state: &'a mut LedgerState,
    undo: StateUndo,
}

impl<'a> Journal<'a> {
    pub(crate) fn begin(state: &'a mut LedgerState) -> Self {
        let undo = StateUndo {
            accounts: HashMap::new(),
            pools: state.pools.clone(),
            global: state.global,
            session: state.session.clone(),
            registry_len: state.registry.len(),
            deposit_fee_bp: state.deposit_fee_bp,
            claim_fee_bp: state.claim_fee_bp,
        };
        Self { state, undo }
    }

    /// Record `addr` before its first mutation in this operation.
    pub(crate) fn touch(&mut self, addr: &Address) {
        if !self.undo.accounts.contains_key(addr) {
            let prior = self.state.accounts.get(addr).cloned();
            self.undo.accounts.insert(*addr, prior);
        }
    }

    /// Create `addr` if it does not exist yet. New accounts start settled
    /// at the round containing `now`.
    ///
    /// Returns `true` if the account was created.
    pub(crate) fn ensure_account(&mut self, addr: &Address, clock: &RoundClock, now: u64) -> bool {
        self.touch(addr);
        if self.state.accounts.contains_key(addr) {
            return false;
        }
        let pool_count = self.state.pools.len();
        self.state
            .accounts
            .insert(*addr, InvestorAccount::new(pool_count, clock.round_start(now)));
        self.state.registry.push(*addr);
        true
    }

    /// Discard the undo data.
    pub(crate) fn commit(self) {}

    /// Restore everything recorded since [`begin`](Self::begin).
    pub(crate) fn rollback(self) {
        let Journal { state, undo } = self;
        for (addr, prior) in undo.accounts {
            match prior {
                Some(acct) => {
                    state.accounts.insert(addr, acct);
                }
                None => {
                    state.accounts.remove(&addr);
                }
            }
        }
        state.registry.truncate(undo.registry_len);
        state.pools = undo.pools;
        state.global = undo.global;
        state.session = undo.session;
        state.deposit_fee_bp = undo.deposit_fee_bp;
        state.claim_fee_bp = undo.claim_fee_bp;
    }
}
