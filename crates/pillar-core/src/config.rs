//! Ledger configuration.
//!
//! [`LedgerConfig::new`] reproduces the reference deployment: one-day
//! rounds, a 96-hour deposit cooldown, a 30-day criteria-update interval,
//! 10% deposit and claim fees, 50% claim reinvestment and the nine-pool
//! table from [`default_pool_tiers`].

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::clock::RoundClock;
use crate::constants::{
    DEFAULT_CLAIM_FEE_BP, DEFAULT_CRITERIA_UPDATE_DELAY, DEFAULT_DEPOSIT_DELAY,
    DEFAULT_DEPOSIT_FEE_BP, DEFAULT_MIN_CLAIM, DEFAULT_MIN_DEPOSIT, DEFAULT_REINVEST_PERCENT,
    DEFAULT_ROUND_DURATION, DEFAULT_TREASURY_SHARE_PERCENT, MAX_FEE_BP, REFERRAL_DEPTH_CAP,
    BASIS_POINTS,
};
use crate::error::ConfigError;
use crate::rates::{PoolCriteria, PoolTier, RateTable, default_pool_tiers};

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct LedgerConfig {
    /// First instant at which deposits are accepted; origin of the round grid.
    pub start_time: u64,
    pub round_duration: u64,
    /// Cooldown between two deposits from the same account.
    pub deposit_delay: u64,
    /// Minimum time between completed criteria updates.
    pub criteria_update_delay: u64,
    pub deposit_fee_bp: u64,
    pub claim_fee_bp: u64,
    pub max_fee_bp: u64,
    /// Minimum first deposit.
    pub min_deposit: u128,
    pub min_claim: u128,
    pub reinvest_percent: u64,
    /// Share of routed fees for `treasury`; the remainder goes to `treasury2`.
    pub treasury_share_percent: u64,
    pub referral_depth_cap: usize,
    pub rates: RateTable,
    pub pools: Vec<PoolTier>,
    /// The only caller allowed to run administrative operations.
    pub admin: Address,
    pub treasury: Address,
    pub treasury2: Address,
}

impl LedgerConfig {
    pub fn new(start_time: u64, admin: Address, treasury: Address, treasury2: Address) -> Self {
        Self {
            start_time,
            round_duration: DEFAULT_ROUND_DURATION,
            deposit_delay: DEFAULT_DEPOSIT_DELAY,
            criteria_update_delay: DEFAULT_CRITERIA_UPDATE_DELAY,
            deposit_fee_bp: DEFAULT_DEPOSIT_FEE_BP,
            claim_fee_bp: DEFAULT_CLAIM_FEE_BP,
            max_fee_bp: MAX_FEE_BP,
            min_deposit: DEFAULT_MIN_DEPOSIT,
            min_claim: DEFAULT_MIN_CLAIM,
            reinvest_percent: DEFAULT_REINVEST_PERCENT,
            treasury_share_percent: DEFAULT_TREASURY_SHARE_PERCENT,
            referral_depth_cap: REFERRAL_DEPTH_CAP,
            rates: RateTable::default(),
            pools: default_pool_tiers(),
            admin,
            treasury,
            treasury2,
        }
    }

    /// Same configuration with both fees set to zero.
    pub fn without_fees(mut self) -> Self {
        self.deposit_fee_bp = 0;
        self.claim_fee_bp = 0;
        self
    }

    pub fn clock(&self) -> Result<RoundClock, ConfigError> {
        RoundClock::new(self.start_time, self.round_duration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_duration == 0 {
            return Err(ConfigError::ZeroRoundDuration);
        }
        if self.pools.is_empty() {
            return Err(ConfigError::EmptyPoolTable);
        }
        if self.max_fee_bp > BASIS_POINTS {
            return Err(ConfigError::FeeTooHigh { fee: self.max_fee_bp, max: BASIS_POINTS });
        }
        for fee in [self.deposit_fee_bp, self.claim_fee_bp] {
            if fee > self.max_fee_bp {
                return Err(ConfigError::FeeTooHigh { fee, max: self.max_fee_bp });
            }
        }
        for pct in [self.reinvest_percent, self.treasury_share_percent] {
            if pct > 100 {
                return Err(ConfigError::PercentOutOfRange(pct));
            }
        }
        if self.admin.is_zero() {
            return Err(ConfigError::ZeroAddress("admin"));
        }
        if self.treasury.is_zero() {
            return Err(ConfigError::ZeroAddress("treasury"));
        }
        if self.treasury2.is_zero() {
            return Err(ConfigError::ZeroAddress("treasury2"));
        }
        self.rates.validate()?;
        self.validate_pool_order()
    }

    /// Criteria-gated pools must be non-decreasing in both investment
    /// requirements, in pool id order.
    fn validate_pool_order(&self) -> Result<(), ConfigError> {
        let mut prev: Option<PoolCriteria> = None;
        for (id, tier) in self.pools.iter().enumerate() {
            let Some(criteria) = tier.criteria else { continue };
            if let Some(p) = prev {
                if criteria.personal_invest_required < p.personal_invest_required
                    || criteria.total_direct_invest_required < p.total_direct_invest_required
                {
                    return Err(ConfigError::CriteriaOutOfOrder(id));
                }
            }
            prev = Some(criteria);
        }
        Ok(())
    }
}
