//! Protocol constants and reference deployment defaults.
//!
//! All amounts are in the smallest unit (1 token = 10^18 units).
//! All durations are in seconds.

/// Decimal places of the ledger's unit of value.
pub const DECIMALS: u32 = 18;

/// Smallest units per whole token.
pub const TOKEN: u128 = 1_000_000_000_000_000_000;

/// Denominator for fee and pool share rates.
pub const BASIS_POINTS: u64 = 10_000_000;

/// Highest fee an administrator may configure (10%).
pub const MAX_FEE_BP: u64 = 1_000_000;

/// Default deposit fee (10%).
pub const DEFAULT_DEPOSIT_FEE_BP: u64 = 1_000_000;

/// Default claim fee (10%).
pub const DEFAULT_CLAIM_FEE_BP: u64 = 1_000_000;

/// Length of one reward round.
pub const DEFAULT_ROUND_DURATION: u64 = 86_400;

/// Cooldown between two deposits from the same account (96 hours).
pub const DEFAULT_DEPOSIT_DELAY: u64 = 96 * 3_600;

/// Minimum interval between two completed criteria updates (30 days).
pub const DEFAULT_CRITERIA_UPDATE_DELAY: u64 = 30 * 86_400;

/// Minimum size of an account's first deposit.
pub const DEFAULT_MIN_DEPOSIT: u128 = TOKEN;

/// Minimum accumulated reward that can be claimed.
pub const DEFAULT_MIN_CLAIM: u128 = TOKEN;

/// Share of a claim (after fee) put back into the personal balance.
pub const DEFAULT_REINVEST_PERCENT: u64 = 50;

/// Share of routed fees sent to the primary treasury; the rest goes to the second.
pub const DEFAULT_TREASURY_SHARE_PERCENT: u64 = 70;

/// Ancestors above the direct referrer that receive downline credit.
pub const REFERRAL_DEPTH_CAP: usize = 9;

/// Personal yield per round: 30 / 10_000 (0.30%).
pub const PERSONAL_RATE: (u128, u128) = (30, 10_000);

/// Direct referral commission per round: 25 / 100_000 (0.025%).
pub const DIRECT_REFERRAL_RATE: (u128, u128) = (25, 100_000);

/// Downline referral commission per round: 675 / 10_000_000 (0.00675%).
pub const DOWNLINE_REFERRAL_RATE: (u128, u128) = (675, 10_000_000);

/// Number of pools in the reference deployment.
pub const DEFAULT_POOL_COUNT: usize = 9;
