//! The single mutable state object owned by a [`Ledger`](crate::ledger::Ledger).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use pillar_core::address::Address;
use pillar_core::config::LedgerConfig;
use pillar_core::types::{CriteriaUpdateSession, GlobalState, InvestorAccount};

use crate::pool::PoolBook;

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct LedgerState {
    pub(crate) accounts: HashMap<Address, InvestorAccount>,
    /// Every account in creation order. The criteria sweep walks this list.
    pub(crate) registry: Vec<Address>,
    pub(crate) pools: PoolBook,
    pub(crate) global: GlobalState,
    pub(crate) session: CriteriaUpdateSession,
    /// Live fee settings; start from the configuration and change through
    /// the admin setters.
    pub(crate) deposit_fee_bp: u64,
    pub(crate) claim_fee_bp: u64,
}

impl LedgerState {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            accounts: HashMap::new(),
            registry: Vec::new(),
            pools: PoolBook::new(&config.pools, config.start_time),
            global: GlobalState::default(),
            session: CriteriaUpdateSession::default(),
            deposit_fee_bp: config.deposit_fee_bp,
            claim_fee_bp: config.claim_fee_bp,
        }
    }

    pub fn account(&self, addr: &Address) -> Option<&InvestorAccount> {
        self.accounts.get(addr)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &InvestorAccount)> {
        self.registry
            .iter()
            .filter_map(|addr| self.accounts.get(addr).map(|acct| (addr, acct)))
    }

    pub fn registry(&self) -> &[Address] {
        &self.registry
    }

    pub fn pools(&self) -> &PoolBook {
        &self.pools
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn session(&self) -> &CriteriaUpdateSession {
        &self.session
    }

    pub fn deposit_fee_bp(&self) -> u64 {
        self.deposit_fee_bp
    }

    pub fn claim_fee_bp(&self) -> u64 {
        self.claim_fee_bp
    }
}
