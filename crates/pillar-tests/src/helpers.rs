//! Shared fixtures for integration tests.

use pillar_core::address::Address;
use pillar_core::clock::ManualClock;
use pillar_core::config::LedgerConfig;
use pillar_core::constants::{DEFAULT_ROUND_DURATION, TOKEN};
use pillar_core::error::LedgerError;
use pillar_core::transfer::MemoryTransfer;
use pillar_engine::{DepositReceipt, Ledger};

/// Start time used by every fixture.
pub const START: u64 = 1_700_000_000;

/// One round of the default configuration.
pub const ROUND: u64 = DEFAULT_ROUND_DURATION;

/// Deterministic account address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn admin() -> Address {
    Address::from_label("admin")
}

pub fn treasury() -> Address {
    Address::from_label("treasury")
}

pub fn treasury2() -> Address {
    Address::from_label("treasury2")
}

/// `n` whole tokens in base units.
pub fn tokens(n: u128) -> u128 {
    n * TOKEN
}

/// Reference configuration with fees.
pub fn config() -> LedgerConfig {
    LedgerConfig::new(START, admin(), treasury(), treasury2())
}

/// Reference configuration without fees or claim minimum.
pub fn config_without_fees() -> LedgerConfig {
    let mut cfg = config().without_fees();
    cfg.min_claim = 0;
    cfg
}

/// A ledger on a manual clock with an in-memory value transfer.
pub struct Harness {
    pub ledger: Ledger<MemoryTransfer, ManualClock>,
    pub transfer: MemoryTransfer,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(config: LedgerConfig) -> Self {
        let transfer = MemoryTransfer::new();
        let clock = ManualClock::new(config.start_time);
        let ledger = Ledger::new(config, transfer.clone(), clock.clone()).unwrap();
        Self { ledger, transfer, clock }
    }

    pub fn without_fees() -> Self {
        Self::new(config_without_fees())
    }

    /// Mint `amount` to `who` and deposit it.
    pub fn deposit(
        &mut self,
        who: &Address,
        amount: u128,
        referrer: Option<Address>,
    ) -> Result<DepositReceipt, LedgerError> {
        self.transfer.mint(who, amount);
        self.ledger.deposit(who, amount, referrer)
    }

    pub fn advance_rounds(&self, rounds: u64) {
        self.clock.advance(rounds * ROUND);
    }

    /// Move past the deposit cooldown.
    pub fn skip_deposit_delay(&self) {
        self.clock.advance(self.ledger.config().deposit_delay);
    }

    /// Sum of every account's personal balance.
    pub fn sum_of_balances(&self) -> u128 {
        self.ledger
            .state()
            .accounts()
            .map(|(_, a)| a.total_investment)
            .sum()
    }
}
