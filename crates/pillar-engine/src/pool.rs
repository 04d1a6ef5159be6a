//! Per-pool reward-per-share accumulators.
//!
//! Every pool shares one settlement timestamp on the round grid. Settling
//! the book finalizes each elapsed round: an active pool with members
//! earns `total_deposit × share` for the round, split equally between the
//! members present at settlement time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use pillar_core::clock::RoundClock;
use pillar_core::error::LedgerError;
use pillar_core::rates::{PoolCriteria, PoolTier, Rate};
use pillar_core::types::{Pool, PoolPosition};

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct PoolBook {
    pools: Vec<Pool>,
    /// Round boundary up to which every pool has been settled.
    last_settlement: u64,
}

impl PoolBook {
    pub fn new(tiers: &[PoolTier], start: u64) -> Self {
        Self {
            pools: tiers.iter().map(Pool::from_tier).collect(),
            last_settlement: start,
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn last_settlement(&self) -> u64 {
        self.last_settlement
    }

    pub fn get(&self, pool_id: usize) -> Result<&Pool, LedgerError> {
        self.pools.get(pool_id).ok_or(LedgerError::InvalidPoolId(pool_id))
    }

    pub(crate) fn get_mut(&mut self, pool_id: usize) -> Result<&mut Pool, LedgerError> {
        self.pools.get_mut(pool_id).ok_or(LedgerError::InvalidPoolId(pool_id))
    }

    /// Ids of criteria-gated pools, ascending.
    pub fn criteria_pool_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.pools
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_whitelist_only())
            .map(|(id, _)| id)
    }

    /// Finalize every whole round elapsed since the last settlement.
    ///
    /// Returns the number of rounds finalized.
    pub fn settle(
        &mut self,
        total_deposit: u128,
        clock: &RoundClock,
        now: u64,
    ) -> Result<u64, LedgerError> {
        let rounds = clock.rounds_elapsed(self.last_settlement, now);
        if rounds == 0 {
            return Ok(0);
        }

        for pool in self.pools.iter_mut().filter(|p| p.is_active && p.member_count > 0) {
            let round_reward = Rate::basis_points(pool.share_bp).apply(total_deposit)?;
            let increment = round_reward / pool.member_count as u128;
            let gained = increment
                .checked_mul(rounds as u128)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            pool.reward_per_share = pool
                .reward_per_share
                .checked_add(gained)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            pool.last_round_reward = round_reward;
            pool.last_share_increment = increment;
            pool.current_round_reward = round_reward;
        }

        self.last_settlement = clock.advance(self.last_settlement, rounds)?;
        debug!(rounds, settled_to = self.last_settlement, "settled pools");
        Ok(rounds)
    }

    /// Recompute the open-round reward of every active pool.
    pub fn refresh_current(&mut self, total_deposit: u128) -> Result<(), LedgerError> {
        for pool in self.pools.iter_mut() {
            pool.current_round_reward = if pool.is_active {
                Rate::basis_points(pool.share_bp).apply(total_deposit)?
            } else {
                0
            };
        }
        Ok(())
    }

    /// Add a member. The checkpoint starts at the current accumulator, so
    /// nothing finalized before joining is owed.
    pub fn join(
        &mut self,
        pool_id: usize,
        position: &mut PoolPosition,
        total_deposit: u128,
    ) -> Result<(), LedgerError> {
        let pool = self.get_mut(pool_id)?;
        position.is_member = true;
        position.reward_per_share_paid = pool.reward_per_share;
        pool.member_count += 1;
        if !pool.is_active {
            pool.is_active = true;
            pool.current_round_reward = Rate::basis_points(pool.share_bp).apply(total_deposit)?;
            debug!(pool_id, "pool activated");
        }
        Ok(())
    }

    /// Remove a member. The caller must credit the position first.
    pub fn leave(&mut self, pool_id: usize, position: &mut PoolPosition) -> Result<(), LedgerError> {
        let pool = self.get_mut(pool_id)?;
        position.is_member = false;
        pool.member_count = pool.member_count.saturating_sub(1);
        if pool.member_count == 0 {
            pool.is_active = false;
            pool.current_round_reward = 0;
            debug!(pool_id, "pool deactivated");
        }
        Ok(())
    }

    /// Accumulated reward owed on `position` and move its checkpoint forward.
    pub fn take_owed(&self, pool_id: usize, position: &mut PoolPosition) -> Result<u128, LedgerError> {
        let pool = self.get(pool_id)?;
        let owed = pool.reward_per_share.saturating_sub(position.reward_per_share_paid);
        position.reward_per_share_paid = pool.reward_per_share;
        Ok(owed)
    }

    pub(crate) fn set_criteria(
        &mut self,
        pool_id: usize,
        criteria: PoolCriteria,
    ) -> Result<(), LedgerError> {
        self.get_mut(pool_id)?.criteria = Some(criteria);
        Ok(())
    }
}
