//! Error types for the Pillar ledger.
use thiserror::Error;

use crate::address::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length: expected 20 bytes, got {0}")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("missing 0x prefix")] MissingPrefix,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("empty amount")] Empty,
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("too many decimals: {found} > {max}")] TooManyDecimals { found: usize, max: u32 },
    #[error("amount overflow")] Overflow,
}

/// Failures reported by a [`ValueTransfer`](crate::traits::ValueTransfer) collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds for {account}: have {have}, need {need}")] InsufficientFunds { account: Address, have: u128, need: u128 },
    #[error("transfer rejected for {0}")] Rejected(Address),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("round duration must be non-zero")] ZeroRoundDuration,
    #[error("pool table is empty")] EmptyPoolTable,
    #[error("fee too high: {fee} > {max}")] FeeTooHigh { fee: u64, max: u64 },
    #[error("percentage out of range: {0}")] PercentOutOfRange(u64),
    #[error("zero address for {0}")] ZeroAddress(&'static str),
    #[error("zero denominator in {0} rate")] ZeroDenominator(&'static str),
    #[error("criteria out of order at pool {0}")] CriteriaOutOfOrder(usize),
    #[error("pool count mismatch: config {config}, state {state}")] PoolCountMismatch { config: usize, state: usize },
}

/// Errors returned by ledger operations.
///
/// Every error leaves ledger state exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // Temporal.
    #[error("deposit not yet available: now {now}, available at {available_at}")] DepositNotYetAvailable { now: u64, available_at: u64 },
    #[error("criteria update not yet available: now {now}, available at {available_at}")] CriteriaUpdateNotYetAvailable { now: u64, available_at: u64 },
    #[error("start time {start} is in the past (now {now})")] InvalidStartTime { start: u64, now: u64 },

    // Threshold.
    #[error("zero amount")] ZeroAmount,
    #[error("deposit below minimum: {amount} < {minimum}")] AmountBelowMinimum { amount: u128, minimum: u128 },
    #[error("claim below minimum: {amount} < {minimum}")] ClaimBelowMinimum { amount: u128, minimum: u128 },
    #[error("invalid fee: {fee} > {max}")] InvalidFee { fee: u64, max: u64 },
    #[error("pool criteria sequence broken at pool {pool_id}")] SequencePoolCriteriaBroken { pool_id: usize },
    #[error("direct investment requirement below twice the personal requirement at pool {pool_id}")] HalfRequirementViolated { pool_id: usize },

    // State conflict.
    #[error("referrer already set")] ReferrerAlreadySet,
    #[error("investor already whitelisted in pool {pool_id}")] InvestorAlreadyWhitelisted { pool_id: usize },
    #[error("investor not whitelisted in pool {pool_id}")] InvestorNotWhitelisted { pool_id: usize },
    #[error("invalid pool id: {0}")] InvalidPoolId(usize),
    #[error("array lengths mismatch: {pools} pool ids, {criteria} criteria")] InvalidArrayLengths { pools: usize, criteria: usize },
    #[error("criteria update in progress")] CriteriaUpdateInProgress,
    #[error("no criteria update in progress")] NoCriteriaUpdateInProgress,
    #[error("unknown account: {0}")] UnknownAccount(Address),

    // Authorization.
    #[error("unauthorized caller: {0}")] Unauthorized(Address),

    #[error("transfer: {0}")] Transfer(#[from] TransferError),
    #[error("config: {0}")] Config(#[from] ConfigError),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("io: {0}")] Io(String),
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("trailing bytes after snapshot: {0}")] TrailingBytes(usize),
    #[error("config: {0}")] Config(#[from] ConfigError),
}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        SnapshotError::Io(e.to_string())
    }
}
