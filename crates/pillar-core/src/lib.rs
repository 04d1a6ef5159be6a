//! # pillar-core
//! Foundation types and traits for the Pillar ledger.

pub mod address;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod rates;
pub mod traits;
pub mod transfer;
pub mod types;
pub mod units;
