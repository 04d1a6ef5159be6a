//! Integration test suite for the Pillar ledger.
//!
//! Scenario tests drive a full [`Ledger`](pillar_engine::Ledger) through
//! deposits, claims, whitelisting and criteria updates on a manual clock.
//! Property tests check the ledger-wide invariants over random operation
//! sequences.

pub mod helpers;
