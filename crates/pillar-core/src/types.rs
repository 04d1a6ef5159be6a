//! Ledger state records: accounts, pools, global counters and the
//! criteria-update session.
//!
//! All amounts are in smallest units (u128). All timestamps are Unix
//! seconds (u64).

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::LedgerError;
use crate::rates::{PoolCriteria, PoolTier};

/// An account's standing in one pool.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct PoolPosition {
    pub is_member: bool,
    /// Pool accumulator value up to which this account has been credited.
    pub reward_per_share_paid: u128,
}

/// Reward split by category.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct RewardBreakdown {
    pub personal: u128,
    pub referral: u128,
    pub pool: u128,
}

impl RewardBreakdown {
    pub fn total(&self) -> Result<u128, LedgerError> {
        self.personal
            .checked_add(self.referral)
            .and_then(|v| v.checked_add(self.pool))
            .ok_or(LedgerError::ArithmeticOverflow)
    }
}

/// Per-participant ledger record.
///
/// Created the first time an address deposits, is named as a referrer, or
/// is whitelisted. Never removed.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct InvestorAccount {
    /// Personal balance. Only grows: deposits and claim reinvestments.
    pub total_investment: u128,
    pub direct_refs_count: u64,
    pub downline_refs_count: u64,
    pub total_direct_investment: u128,
    pub total_downline_investment: u128,
    /// Set at most once, on the first deposit.
    pub referrer: Option<Address>,
    /// Per-round amounts from the most recent settlement.
    pub last_round_rewards: RewardBreakdown,
    /// Settled, unclaimed reward.
    pub accumulated_reward: u128,
    pub last_claim_at: Option<u64>,
    pub first_deposit_at: Option<u64>,
    pub last_deposit_at: Option<u64>,
    /// Round boundary up to which rewards have been settled.
    pub last_settlement: u64,
    /// Indexed by pool id.
    pub positions: Vec<PoolPosition>,
}

impl InvestorAccount {
    pub fn new(pool_count: usize, last_settlement: u64) -> Self {
        Self {
            last_settlement,
            positions: vec![PoolPosition::default(); pool_count],
            ..Self::default()
        }
    }

    /// Whether this account has ever deposited.
    pub fn is_investor(&self) -> bool {
        self.first_deposit_at.is_some()
    }

    pub fn is_member(&self, pool_id: usize) -> bool {
        self.positions.get(pool_id).is_some_and(|p| p.is_member)
    }

    /// Ids of the pools this account belongs to.
    pub fn member_pools(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_member)
            .map(|(id, _)| id)
    }
}

/// A reward pool.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Pool {
    pub is_active: bool,
    /// Reward accruing in the still-open round.
    pub current_round_reward: u128,
    /// Reward finalized for the last completed round.
    pub last_round_reward: u128,
    pub member_count: u64,
    /// Cumulative per-member reward. Never decreases.
    pub reward_per_share: u128,
    /// Per-member share of the last finalized round.
    pub last_share_increment: u128,
    /// `None` for whitelist-only pools.
    pub criteria: Option<PoolCriteria>,
    pub share_bp: u64,
}

impl Pool {
    pub fn from_tier(tier: &PoolTier) -> Self {
        Self {
            is_active: false,
            current_round_reward: 0,
            last_round_reward: 0,
            member_count: 0,
            reward_per_share: 0,
            last_share_increment: 0,
            criteria: tier.criteria,
            share_bp: tier.share_bp,
        }
    }

    pub fn is_whitelist_only(&self) -> bool {
        self.criteria.is_none()
    }
}

/// Process-wide counters.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct GlobalState {
    /// Sum of every account's personal balance.
    pub total_deposit: u128,
    /// Accounts that have deposited at least once.
    pub investor_count: u64,
    /// Accounts holding at least one whitelist membership.
    pub whitelisted_count: u64,
    /// Withheld fees not yet routed to the treasuries.
    pub pending_fees: u128,
}

/// State of the criteria replacement protocol.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct CriteriaUpdateSession {
    pub is_active: bool,
    /// Proposed `(pool_id, criteria)` pairs, applied when the sweep ends.
    pub staged: Vec<(usize, PoolCriteria)>,
    /// Index of the next account to re-evaluate.
    pub cursor: usize,
    pub last_completed_at: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::default_pool_tiers;

    #[test]
    fn new_account_has_one_position_per_pool() {
        let acct = InvestorAccount::new(9, 1_000);
        assert_eq!(acct.positions.len(), 9);
        assert_eq!(acct.last_settlement, 1_000);
        assert!(!acct.is_investor());
        assert_eq!(acct.member_pools().count(), 0);
        assert!(!acct.is_member(42));
    }

    #[test]
    fn member_pools_lists_memberships() {
        let mut acct = InvestorAccount::new(4, 0);
        acct.positions[1].is_member = true;
        acct.positions[3].is_member = true;
        assert_eq!(acct.member_pools().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn pools_start_inactive() {
        let tiers = default_pool_tiers();
        let pool = Pool::from_tier(&tiers[0]);
        assert!(!pool.is_active);
        assert!(!pool.is_whitelist_only());
        assert!(Pool::from_tier(&tiers[8]).is_whitelist_only());
    }

    #[test]
    fn breakdown_total() {
        let b = RewardBreakdown { personal: 1, referral: 2, pool: 3 };
        assert_eq!(b.total(), Ok(6));
        let b = RewardBreakdown { personal: u128::MAX, referral: 1, pool: 0 };
        assert_eq!(b.total(), Err(LedgerError::ArithmeticOverflow));
    }

    #[test]
    fn bincode_roundtrip_account() {
        let mut acct = InvestorAccount::new(2, 7);
        acct.referrer = Some(Address([9; 20]));
        acct.total_investment = u128::MAX / 3;
        let bytes = bincode::encode_to_vec(&acct, bincode::config::standard()).unwrap();
        let (back, _): (InvestorAccount, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(back, acct);
    }
}
