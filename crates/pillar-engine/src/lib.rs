//! # pillar-engine
//! Reward accrual and pool eligibility engine for the Pillar ledger.
//!
//! - [`pool`] — per-pool reward-per-share accumulators
//! - [`referral`] — referral chains and bounded upward propagation
//! - [`settlement`] — lazy per-account settlement
//! - [`criteria`] — criteria proposals and the resumable sweep
//! - [`ledger`] — deposit, claim and administrative operations
//! - [`snapshot`] — binary persistence of ledger state

pub mod criteria;
pub mod fees;
mod journal;
pub mod ledger;
pub mod pool;
pub mod referral;
pub mod settlement;
pub mod snapshot;
pub mod state;

pub use criteria::SweepProgress;
pub use ledger::{ClaimReceipt, DepositReceipt, Ledger};
pub use pool::PoolBook;
pub use snapshot::LedgerSnapshot;
pub use state::LedgerState;
