//! Reward rates and pool tiers.
//!
//! Each reward category carries its own numerator/denominator pair; the
//! categories do not share a common scale.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BASIS_POINTS, DIRECT_REFERRAL_RATE, DOWNLINE_REFERRAL_RATE, PERSONAL_RATE, TOKEN,
};
use crate::error::{ConfigError, LedgerError};

/// A fractional per-round rate `numerator / denominator`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Rate {
    pub numerator: u128,
    pub denominator: u128,
}

impl Rate {
    pub const fn new(numerator: u128, denominator: u128) -> Self {
        Self { numerator, denominator }
    }

    /// Rate of `bp` over [`BASIS_POINTS`].
    pub const fn basis_points(bp: u64) -> Self {
        Self::new(bp as u128, BASIS_POINTS as u128)
    }

    /// `amount × numerator / denominator`, rounded down.
    pub fn apply(&self, amount: u128) -> Result<u128, LedgerError> {
        if self.denominator == 0 {
            return Err(LedgerError::ArithmeticOverflow);
        }
        Ok(amount
            .checked_mul(self.numerator)
            .ok_or(LedgerError::ArithmeticOverflow)?
            / self.denominator)
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl From<(u128, u128)> for Rate {
    fn from((numerator, denominator): (u128, u128)) -> Self {
        Self::new(numerator, denominator)
    }
}

/// Per-round rates for the personal and referral reward categories.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RateTable {
    pub personal: Rate,
    pub direct_referral: Rate,
    pub downline_referral: Rate,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            personal: PERSONAL_RATE.into(),
            direct_referral: DIRECT_REFERRAL_RATE.into(),
            downline_referral: DOWNLINE_REFERRAL_RATE.into(),
        }
    }
}

impl RateTable {
    /// Personal yield for one round on `balance`.
    pub fn personal(&self, balance: u128) -> Result<u128, LedgerError> {
        self.personal.apply(balance)
    }

    /// Referral commission for one round on the two referral deposit totals.
    pub fn referral(&self, direct_total: u128, downline_total: u128) -> Result<u128, LedgerError> {
        self.direct_referral
            .apply(direct_total)?
            .checked_add(self.downline_referral.apply(downline_total)?)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.personal.denominator == 0 {
            return Err(ConfigError::ZeroDenominator("personal"));
        }
        if self.direct_referral.denominator == 0 {
            return Err(ConfigError::ZeroDenominator("direct referral"));
        }
        if self.downline_referral.denominator == 0 {
            return Err(ConfigError::ZeroDenominator("downline referral"));
        }
        Ok(())
    }
}

/// Eligibility thresholds of a criteria-gated pool.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct PoolCriteria {
    pub personal_invest_required: u128,
    pub total_direct_invest_required: u128,
    pub direct_refs_required: u64,
}

impl PoolCriteria {
    pub const fn new(personal: u128, total_direct: u128, direct_refs: u64) -> Self {
        Self {
            personal_invest_required: personal,
            total_direct_invest_required: total_direct,
            direct_refs_required: direct_refs,
        }
    }

    /// Criteria given in whole tokens.
    pub const fn in_tokens(personal: u128, total_direct: u128, direct_refs: u64) -> Self {
        Self::new(personal * TOKEN, total_direct * TOKEN, direct_refs)
    }

    /// Whether an account with these totals meets every threshold.
    pub fn is_met_by(&self, personal: u128, total_direct: u128, direct_refs: u64) -> bool {
        personal >= self.personal_invest_required
            && total_direct >= self.total_direct_invest_required
            && direct_refs >= self.direct_refs_required
    }

    /// Whether the direct-investment requirement is at least twice the personal one.
    pub fn meets_half_requirement(&self) -> bool {
        self.personal_invest_required
            .checked_mul(2)
            .is_some_and(|double| self.total_direct_invest_required >= double)
    }
}

/// Static configuration of one pool.
///
/// `criteria == None` marks a whitelist-only pool.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct PoolTier {
    pub criteria: Option<PoolCriteria>,
    /// Share of the total deposit paid out per round, over [`BASIS_POINTS`].
    pub share_bp: u64,
}

impl PoolTier {
    pub const fn gated(criteria: PoolCriteria, share_bp: u64) -> Self {
        Self { criteria: Some(criteria), share_bp }
    }

    pub const fn whitelist(share_bp: u64) -> Self {
        Self { criteria: None, share_bp }
    }

    pub fn rate(&self) -> Rate {
        Rate::basis_points(self.share_bp)
    }
}

/// Pool table of the reference deployment.
///
/// Pools 0–6 are criteria-gated, 7 and 8 are whitelist-only.
pub fn default_pool_tiers() -> Vec<PoolTier> {
    vec![
        PoolTier::gated(PoolCriteria::in_tokens(550_000, 550_000, 1), 1_750),
        PoolTier::gated(PoolCriteria::in_tokens(1_450_000, 1_450_000, 3), 1_750),
        PoolTier::gated(PoolCriteria::in_tokens(3_000_000, 6_000_000, 5), 1_750),
        PoolTier::gated(PoolCriteria::in_tokens(5_500_000, 11_000_000, 10), 1_750),
        PoolTier::gated(PoolCriteria::in_tokens(14_250_000, 28_500_000, 15), 1_750),
        PoolTier::gated(PoolCriteria::in_tokens(28_500_000, 85_500_000, 20), 1_000),
        PoolTier::gated(PoolCriteria::in_tokens(57_000_000, 171_000_000, 20), 1_000),
        PoolTier::whitelist(1_000),
        PoolTier::whitelist(1_000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::constants::DEFAULT_POOL_COUNT;

    #[test]
    fn default_rates_match_reference_deployment() {
        let rates = RateTable::default();
        // 10 tokens at 0.30% per round.
        assert_eq!(rates.personal(10 * TOKEN).unwrap(), 30_000_000_000_000_000);
        // 0.025% of direct plus 0.00675% of downline.
        assert_eq!(rates.referral(100_000 * TOKEN, 0).unwrap(), 25 * TOKEN);
        assert_eq!(rates.referral(0, 10_000_000 * TOKEN).unwrap(), 675 * TOKEN);
    }

    #[test]
    fn pool_share_is_basis_points_of_ten_million() {
        let tiers = default_pool_tiers();
        assert_eq!(tiers.len(), DEFAULT_POOL_COUNT);
        assert_eq!(tiers[0].rate().apply(10_000_000 * TOKEN).unwrap(), 1_750 * TOKEN);
        assert_eq!(tiers[5].rate().apply(10_000_000 * TOKEN).unwrap(), 1_000 * TOKEN);
        assert!(tiers[7].criteria.is_none());
        assert!(tiers[8].criteria.is_none());
    }

    #[test]
    fn criteria_thresholds_are_inclusive() {
        let c = PoolCriteria::in_tokens(550_000, 550_000, 1);
        assert!(c.is_met_by(550_000 * TOKEN, 550_000 * TOKEN, 1));
        assert!(!c.is_met_by(550_000 * TOKEN - 1, 550_000 * TOKEN, 1));
        assert!(!c.is_met_by(550_000 * TOKEN, 550_000 * TOKEN, 0));
    }

    #[test]
    fn half_requirement() {
        assert!(PoolCriteria::in_tokens(275_000, 550_000, 1).meets_half_requirement());
        assert!(!PoolCriteria::in_tokens(550_000, 550_000, 1).meets_half_requirement());
        assert!(!PoolCriteria::new(u128::MAX, u128::MAX, 0).meets_half_requirement());
    }

    #[test]
    fn zero_denominator_is_rejected() {
        let mut rates = RateTable::default();
        rates.downline_referral.denominator = 0;
        assert_eq!(rates.validate(), Err(ConfigError::ZeroDenominator("downline referral")));
        assert_eq!(Rate::new(1, 0).apply(1), Err(LedgerError::ArithmeticOverflow));
    }

    proptest! {
        #[test]
        fn apply_never_exceeds_amount_for_sub_unit_rates(
            amount in 0u128..(u64::MAX as u128),
            num in 0u128..10_000,
        ) {
            let rate = Rate::new(num, 10_000);
            prop_assert!(rate.apply(amount).unwrap() <= amount);
        }
    }
}
