//! Referral graph: parent pointers and bounded upward propagation.
//!
//! Each account has at most one referrer, fixed on its first deposit. A
//! deposit credits the direct referrer's direct totals and the downline
//! totals of at most `depth_cap` further ancestors.

use std::collections::HashMap;

use pillar_core::address::Address;
use pillar_core::clock::RoundClock;
use pillar_core::error::LedgerError;
use pillar_core::rates::RateTable;
use pillar_core::types::InvestorAccount;
use tracing::debug;

use crate::journal::Journal;

/// Ancestors above `referrer` that receive downline credit, nearest first.
///
/// Walks at most `depth_cap` hops and stops at the first account without a
/// referrer.
pub fn upline(
    accounts: &HashMap<Address, InvestorAccount>,
    referrer: &Address,
    depth_cap: usize,
) -> Vec<Address> {
    let mut chain = Vec::with_capacity(depth_cap);
    let mut current = accounts.get(referrer).and_then(|a| a.referrer);
    let mut depth = 0;
    while depth < depth_cap {
        let Some(ancestor) = current else { break };
        chain.push(ancestor);
        current = accounts.get(&ancestor).and_then(|a| a.referrer);
        depth += 1;
    }
    chain
}

/// Parameters for one propagation.
pub(crate) struct Propagation<'a> {
    pub rates: &'a RateTable,
    pub clock: &'a RoundClock,
    pub now: u64,
    pub depth_cap: usize,
}

impl Journal<'_> {
    /// Attach `referrer` to `account` if allowed. Returns whether it was set.
    ///
    /// Zero or self referrers are ignored, as is an account that already
    /// has a referrer or one that would close a loop through its own
    /// referees.
    pub(crate) fn attach_referrer(
        &mut self,
        account: &Address,
        referrer: &Address,
        p: &Propagation<'_>,
    ) -> Result<bool, LedgerError> {
        if referrer.is_zero() || referrer == account {
            return Ok(false);
        }
        let already_set = self
            .state
            .accounts
            .get(account)
            .is_some_and(|a| a.referrer.is_some());
        if already_set {
            return Ok(false);
        }
        if upline(&self.state.accounts, referrer, p.depth_cap).contains(account) {
            debug!(%account, %referrer, "referrer ignored: would form a cycle");
            return Ok(false);
        }

        self.ensure_account(referrer, p.clock, p.now);
        self.touch(account);
        if let Some(acct) = self.state.accounts.get_mut(account) {
            acct.referrer = Some(*referrer);
        }
        Ok(true)
    }

    /// Credit `amount` up the referral chain of `account`.
    ///
    /// With `new_referral` the direct referrer's and every credited
    /// ancestor's referral counts grow by one as well. Each credited
    /// account is settled first.
    pub(crate) fn propagate_deposit(
        &mut self,
        account: &Address,
        amount: u128,
        new_referral: bool,
        p: &Propagation<'_>,
    ) -> Result<Option<Address>, LedgerError> {
        let Some(referrer) = self.state.accounts.get(account).and_then(|a| a.referrer) else {
            return Ok(None);
        };

        self.settle(&referrer, p.rates, p.clock, p.now)?;
        if let Some(direct) = self.state.accounts.get_mut(&referrer) {
            direct.total_direct_investment = direct
                .total_direct_investment
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            if new_referral {
                direct.direct_refs_count += 1;
            }
        }

        let ancestors = upline(&self.state.accounts, &referrer, p.depth_cap);
        for ancestor in &ancestors {
            self.settle(ancestor, p.rates, p.clock, p.now)?;
            if let Some(acct) = self.state.accounts.get_mut(ancestor) {
                acct.total_downline_investment = acct
                    .total_downline_investment
                    .checked_add(amount)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                if new_referral {
                    acct.downline_refs_count += 1;
                }
            }
        }
        Ok(Some(referrer))
    }
}
