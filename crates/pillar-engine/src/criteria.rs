//! Pool eligibility criteria and the resumable re-evaluation sweep.
//!
//! Replacing criteria is a two-step protocol. A proposal stages the new
//! thresholds and blocks deposits and claims. The sweep then visits the
//! account registry in batches, settling each account and moving it in or
//! out of every staged pool. When the cursor reaches the end of the
//! registry the staged thresholds become current and the ledger unblocks.
//!
//! The registry length is read on every sweep call, so accounts created
//! while a session is active are still visited before it completes.

use tracing::{debug, info};

use pillar_core::address::Address;
use pillar_core::clock::RoundClock;
use pillar_core::error::LedgerError;
use pillar_core::rates::{PoolCriteria, RateTable};
use pillar_core::types::{CriteriaUpdateSession, InvestorAccount};

use crate::journal::Journal;
use crate::pool::PoolBook;

/// Outcome of a criteria call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepProgress {
    /// Accounts re-evaluated by this call.
    pub visited: usize,
    pub cursor: usize,
    pub registry_len: usize,
    /// Whether the session finished and the new criteria are in force.
    pub completed: bool,
}

/// Whether `acct` meets `criteria`.
pub fn qualifies(acct: &InvestorAccount, criteria: &PoolCriteria) -> bool {
    criteria.is_met_by(
        acct.total_investment,
        acct.total_direct_investment,
        acct.direct_refs_count,
    )
}

/// Check a proposal and return the `(pool_id, criteria)` pairs to stage.
pub fn validate_proposal(
    pools: &PoolBook,
    session: &CriteriaUpdateSession,
    pool_ids: &[usize],
    criteria: &[PoolCriteria],
    update_delay: u64,
    now: u64,
) -> Result<Vec<(usize, PoolCriteria)>, LedgerError> {
    if session.is_active {
        return Err(LedgerError::CriteriaUpdateInProgress);
    }
    if pool_ids.len() != criteria.len() {
        return Err(LedgerError::InvalidArrayLengths {
            pools: pool_ids.len(),
            criteria: criteria.len(),
        });
    }
    if let Some(last) = session.last_completed_at {
        let available_at = last.saturating_add(update_delay);
        if now < available_at {
            return Err(LedgerError::CriteriaUpdateNotYetAvailable { now, available_at });
        }
    }

    let mut staged: Vec<(usize, PoolCriteria)> = Vec::with_capacity(pool_ids.len());
    for (&pool_id, c) in pool_ids.iter().zip(criteria) {
        let pool = pools.get(pool_id)?;
        if pool.is_whitelist_only() || staged.iter().any(|(id, _)| *id == pool_id) {
            return Err(LedgerError::InvalidPoolId(pool_id));
        }
        staged.push((pool_id, *c));
    }

    // Effective table: current criteria with the staged values laid over.
    let effective: Vec<(usize, PoolCriteria)> = pools
        .criteria_pool_ids()
        .filter_map(|id| {
            let current = pools.get(id).ok()?.criteria?;
            let c = staged
                .iter()
                .find(|(sid, _)| *sid == id)
                .map_or(current, |(_, c)| *c);
            Some((id, c))
        })
        .collect();

    for (pool_id, c) in &staged {
        let Some(pos) = effective.iter().position(|(id, _)| id == pool_id) else {
            return Err(LedgerError::InvalidPoolId(*pool_id));
        };
        let lower = pos.checked_sub(1).and_then(|i| effective.get(i));
        let higher = effective.get(pos + 1);
        let below_lower = lower.is_some_and(|(_, l)| {
            c.personal_invest_required < l.personal_invest_required
                || c.total_direct_invest_required < l.total_direct_invest_required
        });
        let above_higher = higher.is_some_and(|(_, h)| {
            c.personal_invest_required > h.personal_invest_required
                || c.total_direct_invest_required > h.total_direct_invest_required
        });
        if below_lower || above_higher {
            return Err(LedgerError::SequencePoolCriteriaBroken { pool_id: *pool_id });
        }
    }

    for (pool_id, c) in &staged {
        if !c.meets_half_requirement() {
            return Err(LedgerError::HalfRequirementViolated { pool_id: *pool_id });
        }
    }

    Ok(staged)
}

impl Journal<'_> {
    /// Join every criteria pool `addr` newly qualifies for under the
    /// current thresholds. Existing memberships are left alone.
    ///
    /// Returns the pools joined.
    pub(crate) fn join_qualifying_pools(&mut self, addr: &Address) -> Result<Vec<usize>, LedgerError> {
        self.touch(addr);
        let state = &mut *self.state;
        let total = state.global.total_deposit;
        let acct = state
            .accounts
            .get_mut(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;

        let eligible: Vec<usize> = state
            .pools
            .pools()
            .iter()
            .enumerate()
            .filter(|(id, pool)| {
                !acct.is_member(*id) && pool.criteria.as_ref().is_some_and(|c| qualifies(acct, c))
            })
            .map(|(id, _)| id)
            .collect();

        for &pool_id in &eligible {
            let position = acct
                .positions
                .get_mut(pool_id)
                .ok_or(LedgerError::InvalidPoolId(pool_id))?;
            state.pools.join(pool_id, position, total)?;
            debug!(account = %addr, pool_id, "joined pool");
        }
        Ok(eligible)
    }

    /// Re-evaluate `addr` against every staged pool. The account must
    /// already be settled.
    fn apply_staged(&mut self, addr: &Address) -> Result<(), LedgerError> {
        self.touch(addr);
        let state = &mut *self.state;
        let total = state.global.total_deposit;
        let acct = state
            .accounts
            .get_mut(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;

        for (pool_id, criteria) in &state.session.staged {
            let pool_id = *pool_id;
            let eligible = qualifies(acct, criteria);
            let position = acct
                .positions
                .get_mut(pool_id)
                .ok_or(LedgerError::InvalidPoolId(pool_id))?;
            match (eligible, position.is_member) {
                (true, false) => {
                    state.pools.join(pool_id, position, total)?;
                    debug!(account = %addr, pool_id, "joined pool");
                }
                (false, true) => {
                    let owed = state.pools.take_owed(pool_id, position)?;
                    state.pools.leave(pool_id, position)?;
                    acct.accumulated_reward = acct
                        .accumulated_reward
                        .checked_add(owed)
                        .ok_or(LedgerError::ArithmeticOverflow)?;
                    debug!(account = %addr, pool_id, "left pool");
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Stage a validated proposal.
    pub(crate) fn open_session(&mut self, staged: Vec<(usize, PoolCriteria)>) {
        let session = &mut self.state.session;
        session.is_active = true;
        session.staged = staged;
        session.cursor = 0;
    }

    /// Re-evaluate up to `batch` accounts from the cursor, completing the
    /// session if the cursor reaches the end of the registry.
    pub(crate) fn sweep(
        &mut self,
        batch: usize,
        rates: &RateTable,
        clock: &RoundClock,
        now: u64,
    ) -> Result<SweepProgress, LedgerError> {
        if !self.state.session.is_active {
            return Err(LedgerError::NoCriteriaUpdateInProgress);
        }

        let mut visited = 0;
        while visited < batch && self.state.session.cursor < self.state.registry.len() {
            let addr = self.state.registry[self.state.session.cursor];
            self.settle(&addr, rates, clock, now)?;
            self.apply_staged(&addr)?;
            self.state.session.cursor += 1;
            visited += 1;
        }

        let cursor = self.state.session.cursor;
        let registry_len = self.state.registry.len();
        let completed = cursor >= registry_len;
        if completed {
            self.complete_session(now)?;
        }
        Ok(SweepProgress { visited, cursor, registry_len, completed })
    }

    fn complete_session(&mut self, now: u64) -> Result<(), LedgerError> {
        let staged = std::mem::take(&mut self.state.session.staged);
        for (pool_id, criteria) in &staged {
            self.state.pools.set_criteria(*pool_id, *criteria)?;
        }
        let session = &mut self.state.session;
        session.is_active = false;
        session.cursor = 0;
        session.last_completed_at = Some(now);
        info!(pools = staged.len(), "criteria update completed");
        Ok(())
    }
}
