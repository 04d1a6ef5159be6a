//! Lazy per-account settlement.
//!
//! An account is settled by converting the whole rounds elapsed since its
//! last settlement into accumulated reward, using the balances it held
//! during those rounds. Callers settle the pool book first and settle an
//! account before changing anything its rewards depend on.

use tracing::debug;

use pillar_core::address::Address;
use pillar_core::clock::RoundClock;
use pillar_core::error::LedgerError;
use pillar_core::rates::RateTable;
use pillar_core::types::{InvestorAccount, RewardBreakdown};

use crate::journal::Journal;
use crate::pool::PoolBook;
use crate::state::LedgerState;

/// Settle `acct` up to the last round boundary before `now`.
///
/// `pools` must already be settled to `now`. Returns the number of rounds
/// credited; zero rounds leaves the account untouched.
pub fn settle_account(
    acct: &mut InvestorAccount,
    pools: &PoolBook,
    rates: &RateTable,
    clock: &RoundClock,
    now: u64,
) -> Result<u64, LedgerError> {
    let rounds = clock.rounds_elapsed(acct.last_settlement, now);
    if rounds == 0 {
        return Ok(0);
    }

    let personal = rates.personal(acct.total_investment)?;
    let referral = rates.referral(acct.total_direct_investment, acct.total_downline_investment)?;

    let mut pool_credit: u128 = 0;
    let mut pool_last: u128 = 0;
    for (pool_id, position) in acct.positions.iter_mut().enumerate() {
        if !position.is_member {
            continue;
        }
        let owed = pools.take_owed(pool_id, position)?;
        pool_credit = pool_credit.checked_add(owed).ok_or(LedgerError::ArithmeticOverflow)?;
        pool_last = pool_last
            .checked_add(pools.get(pool_id)?.last_share_increment)
            .ok_or(LedgerError::ArithmeticOverflow)?;
    }

    let per_round = RewardBreakdown { personal, referral, pool: 0 }.total()?;
    let earned = per_round
        .checked_mul(rounds as u128)
        .and_then(|v| v.checked_add(pool_credit))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    acct.accumulated_reward = acct
        .accumulated_reward
        .checked_add(earned)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    acct.last_round_rewards = RewardBreakdown { personal, referral, pool: pool_last };
    acct.last_settlement = clock.advance(acct.last_settlement, rounds)?;
    Ok(rounds)
}

/// Credit only the pool deltas of `acct`, leaving personal and referral
/// rewards for its next full settlement.
pub fn credit_pool_positions(acct: &mut InvestorAccount, pools: &PoolBook) -> Result<u128, LedgerError> {
    let mut credit: u128 = 0;
    for (pool_id, position) in acct.positions.iter_mut().enumerate() {
        if position.is_member {
            let owed = pools.take_owed(pool_id, position)?;
            credit = credit.checked_add(owed).ok_or(LedgerError::ArithmeticOverflow)?;
        }
    }
    acct.accumulated_reward = acct
        .accumulated_reward
        .checked_add(credit)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(credit)
}

/// The account as it would look if settled at `now`, without mutating state.
pub fn project_account(
    state: &LedgerState,
    addr: &Address,
    rates: &RateTable,
    clock: &RoundClock,
    now: u64,
) -> Result<Option<InvestorAccount>, LedgerError> {
    let Some(acct) = state.accounts.get(addr) else {
        return Ok(None);
    };
    let mut pools = state.pools.clone();
    pools.settle(state.global.total_deposit, clock, now)?;
    let mut acct = acct.clone();
    settle_account(&mut acct, &pools, rates, clock, now)?;
    Ok(Some(acct))
}

impl Journal<'_> {
    pub(crate) fn settle_pools(&mut self, clock: &RoundClock, now: u64) -> Result<u64, LedgerError> {
        let total = self.state.global.total_deposit;
        self.state.pools.settle(total, clock, now)
    }

    pub(crate) fn settle(
        &mut self,
        addr: &Address,
        rates: &RateTable,
        clock: &RoundClock,
        now: u64,
    ) -> Result<u64, LedgerError> {
        self.touch(addr);
        let state = &mut *self.state;
        let acct = state
            .accounts
            .get_mut(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;
        let rounds = settle_account(acct, &state.pools, rates, clock, now)?;
        if rounds > 0 {
            debug!(account = %addr, rounds, accumulated = acct.accumulated_reward, "settled account");
        }
        Ok(rounds)
    }

    pub(crate) fn credit_pools(&mut self, addr: &Address) -> Result<u128, LedgerError> {
        self.touch(addr);
        let state = &mut *self.state;
        let acct = state
            .accounts
            .get_mut(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;
        credit_pool_positions(acct, &state.pools)
    }
}
