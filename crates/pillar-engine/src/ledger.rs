//! The ledger: deposit, claim and administrative operations.
//!
//! Every mutating operation runs the same way:
//! 1. check preconditions that need no mutation
//! 2. open a journal and settle the pool book to `now`
//! 3. settle every account the operation touches before changing it
//! 4. apply the effect and call the value-transfer collaborator
//! 5. commit, or roll back on any error
//!
//! Withheld fees are routed to the treasuries after the commit.

use tracing::info;

use pillar_core::address::Address;
use pillar_core::clock::RoundClock;
use pillar_core::config::LedgerConfig;
use pillar_core::error::{ConfigError, LedgerError};
use pillar_core::rates::{PoolCriteria, RateTable};
use pillar_core::traits::{Clock, ValueTransfer};
use pillar_core::types::{CriteriaUpdateSession, GlobalState, InvestorAccount, Pool, RewardBreakdown};

use crate::criteria::{SweepProgress, validate_proposal};
use crate::fees::{FeeRoute, check_fee, route_pending, withhold};
use crate::journal::Journal;
use crate::pool::PoolBook;
use crate::referral::Propagation;
use crate::settlement::project_account;
use crate::state::LedgerState;

/// Result of a successful deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub gross: u128,
    pub fee: u128,
    /// Amount credited to the personal balance.
    pub net: u128,
    pub first_deposit: bool,
    /// Criteria pools the depositor joined.
    pub joined_pools: Vec<usize>,
}

/// Result of a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub claimed: u128,
    pub fee: u128,
    pub reinvested: u128,
    pub paid_out: u128,
}

pub struct Ledger<T: ValueTransfer, C: Clock> {
    config: LedgerConfig,
    clock: RoundClock,
    state: LedgerState,
    transfer: T,
    time: C,
}

impl<T: ValueTransfer, C: Clock> Ledger<T, C> {
    /// Create a ledger with empty state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Config`] if the configuration is invalid
    /// - [`LedgerError::InvalidStartTime`] if the start time is in the past
    pub fn new(config: LedgerConfig, transfer: T, time: C) -> Result<Self, LedgerError> {
        config.validate()?;
        let now = time.now();
        if config.start_time < now {
            return Err(LedgerError::InvalidStartTime { start: config.start_time, now });
        }
        let clock = config.clock()?;
        let state = LedgerState::new(&config);
        info!(start = config.start_time, pools = config.pools.len(), "ledger created");
        Ok(Self { config, clock, state, transfer, time })
    }

    /// Resume from previously saved state. The start time may be in the past.
    pub fn from_parts(
        config: LedgerConfig,
        state: LedgerState,
        transfer: T,
        time: C,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let clock = config.clock()?;
        if state.pools.len() != config.pools.len() {
            return Err(ConfigError::PoolCountMismatch {
                config: config.pools.len(),
                state: state.pools.len(),
            }
            .into());
        }
        Ok(Self { config, clock, state, transfer, time })
    }

    fn ensure_admin(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.config.admin {
            return Err(LedgerError::Unauthorized(*caller));
        }
        Ok(())
    }

    fn ensure_no_session(&self) -> Result<(), LedgerError> {
        if self.state.session.is_active {
            return Err(LedgerError::CriteriaUpdateInProgress);
        }
        Ok(())
    }

    fn route_fees(&mut self) {
        let route = FeeRoute {
            treasury: self.config.treasury,
            treasury2: self.config.treasury2,
            treasury_share_percent: self.config.treasury_share_percent,
        };
        route_pending(&mut self.state.global, &self.transfer, &route);
    }

    // --- operations ---

    /// Deposit `amount` from `caller`, optionally naming a referrer on the
    /// first deposit.
    pub fn deposit(
        &mut self,
        caller: &Address,
        amount: u128,
        referrer: Option<Address>,
    ) -> Result<DepositReceipt, LedgerError> {
        let now = self.time.now();
        self.ensure_no_session()?;
        if !self.clock.has_started(now) {
            return Err(LedgerError::DepositNotYetAvailable { now, available_at: self.clock.start() });
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let existing = self.state.accounts.get(caller);
        let first_deposit = existing.is_none_or(|a| !a.is_investor());
        if first_deposit {
            if amount < self.config.min_deposit {
                return Err(LedgerError::AmountBelowMinimum { amount, minimum: self.config.min_deposit });
            }
        } else {
            if let Some(last) = existing.and_then(|a| a.last_deposit_at) {
                let available_at = last.saturating_add(self.config.deposit_delay);
                if now < available_at {
                    return Err(LedgerError::DepositNotYetAvailable { now, available_at });
                }
            }
            if referrer.is_some_and(|r| !r.is_zero()) {
                return Err(LedgerError::ReferrerAlreadySet);
            }
        }

        let (fee, net) = withhold(amount, self.state.deposit_fee_bp)?;
        let propagation = Propagation {
            rates: &self.config.rates,
            clock: &self.clock,
            now,
            depth_cap: self.config.referral_depth_cap,
        };

        let mut journal = Journal::begin(&mut self.state);
        let result = apply_deposit(&mut journal, caller, net, fee, first_deposit, referrer, &propagation)
            .and_then(|joined| {
                self.transfer
                    .pull(caller, amount)
                    .map(|()| joined)
                    .map_err(LedgerError::from)
            });
        let joined_pools = match result {
            Ok(joined) => {
                journal.commit();
                joined
            }
            Err(e) => {
                journal.rollback();
                return Err(e);
            }
        };

        info!(account = %caller, gross = amount, net, fee, first_deposit, "deposit");
        self.route_fees();
        Ok(DepositReceipt { gross: amount, fee, net, first_deposit, joined_pools })
    }

    /// Claim the caller's accumulated reward.
    ///
    /// After the claim fee, `reinvest_percent` of the remainder is added to
    /// the personal balance and the rest is paid out.
    pub fn claim(&mut self, caller: &Address) -> Result<ClaimReceipt, LedgerError> {
        let now = self.time.now();
        self.ensure_no_session()?;
        if !self.state.accounts.contains_key(caller) {
            return Err(LedgerError::UnknownAccount(*caller));
        }

        let propagation = Propagation {
            rates: &self.config.rates,
            clock: &self.clock,
            now,
            depth_cap: self.config.referral_depth_cap,
        };
        let claim_fee_bp = self.state.claim_fee_bp;
        let min_claim = self.config.min_claim;
        let reinvest_percent = self.config.reinvest_percent;

        let mut journal = Journal::begin(&mut self.state);
        let result = apply_claim(
            &mut journal,
            caller,
            claim_fee_bp,
            min_claim,
            reinvest_percent,
            &propagation,
        )
        .and_then(|receipt| {
            if receipt.paid_out == 0 {
                return Ok(receipt);
            }
            self.transfer
                .push(caller, receipt.paid_out)
                .map(|()| receipt)
                .map_err(LedgerError::from)
        });
        let receipt = match result {
            Ok(receipt) => {
                journal.commit();
                receipt
            }
            Err(e) => {
                journal.rollback();
                return Err(e);
            }
        };

        info!(
            account = %caller,
            claimed = receipt.claimed,
            fee = receipt.fee,
            reinvested = receipt.reinvested,
            paid_out = receipt.paid_out,
            "claim"
        );
        self.route_fees();
        Ok(receipt)
    }

    pub fn set_deposit_fee(&mut self, caller: &Address, fee_bp: u64) -> Result<(), LedgerError> {
        self.ensure_admin(caller)?;
        check_fee(fee_bp, self.config.max_fee_bp)?;
        self.state.deposit_fee_bp = fee_bp;
        info!(fee_bp, "deposit fee set");
        Ok(())
    }

    pub fn set_claim_fee(&mut self, caller: &Address, fee_bp: u64) -> Result<(), LedgerError> {
        self.ensure_admin(caller)?;
        check_fee(fee_bp, self.config.max_fee_bp)?;
        self.state.claim_fee_bp = fee_bp;
        info!(fee_bp, "claim fee set");
        Ok(())
    }

    /// Grant or revoke `account`'s membership in a whitelist-only pool.
    ///
    /// Revoking credits every pool the account belongs to before removal.
    pub fn set_whitelist(
        &mut self,
        caller: &Address,
        account: &Address,
        pool_id: usize,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.ensure_admin(caller)?;
        if !self.state.pools.get(pool_id)?.is_whitelist_only() {
            return Err(LedgerError::InvalidPoolId(pool_id));
        }
        let now = self.time.now();
        let clock = self.clock;

        let mut journal = Journal::begin(&mut self.state);
        let result = apply_whitelist(&mut journal, account, pool_id, enabled, &clock, now);
        match result {
            Ok(()) => journal.commit(),
            Err(e) => {
                journal.rollback();
                return Err(e);
            }
        }
        info!(account = %account, pool_id, enabled, "whitelist updated");
        Ok(())
    }

    /// Propose new criteria, continue a sweep, or both.
    ///
    /// - non-empty arrays: stage a proposal, then sweep `sweep_batch`
    ///   accounts if it is non-zero
    /// - empty arrays with `sweep_batch > 0`: continue the active sweep
    pub fn set_pool_criteria(
        &mut self,
        caller: &Address,
        pool_ids: &[usize],
        criteria: &[PoolCriteria],
        sweep_batch: usize,
    ) -> Result<SweepProgress, LedgerError> {
        self.ensure_admin(caller)?;
        let now = self.time.now();
        let continuing = pool_ids.is_empty() && criteria.is_empty();

        let staged = if continuing {
            if sweep_batch == 0 {
                return Err(LedgerError::InvalidArrayLengths { pools: 0, criteria: 0 });
            }
            if !self.state.session.is_active {
                return Err(LedgerError::NoCriteriaUpdateInProgress);
            }
            None
        } else {
            Some(validate_proposal(
                &self.state.pools,
                &self.state.session,
                pool_ids,
                criteria,
                self.config.criteria_update_delay,
                now,
            )?)
        };

        let rates = self.config.rates;
        let clock = self.clock;
        let mut journal = Journal::begin(&mut self.state);
        let result = apply_criteria(&mut journal, staged, sweep_batch, &rates, &clock, now);
        match result {
            Ok(progress) => {
                journal.commit();
                Ok(progress)
            }
            Err(e) => {
                journal.rollback();
                Err(e)
            }
        }
    }

    // --- accessors ---

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn round_clock(&self) -> &RoundClock {
        &self.clock
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn now(&self) -> u64 {
        self.time.now()
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    /// Stored account state, as of its last settlement.
    pub fn account(&self, addr: &Address) -> Option<&InvestorAccount> {
        self.state.accounts.get(addr)
    }

    /// Account state as if settled now.
    pub fn projected_account(&self, addr: &Address) -> Result<Option<InvestorAccount>, LedgerError> {
        project_account(&self.state, addr, &self.config.rates, &self.clock, self.time.now())
    }

    /// Claimable reward including rounds not yet settled.
    pub fn accumulated_rewards(&self, addr: &Address) -> Result<u128, LedgerError> {
        Ok(self.projected_account(addr)?.map_or(0, |a| a.accumulated_reward))
    }

    /// Per-round reward split of the most recent completed round.
    pub fn last_round_rewards(&self, addr: &Address) -> Result<RewardBreakdown, LedgerError> {
        Ok(self.projected_account(addr)?.map_or_else(RewardBreakdown::default, |a| a.last_round_rewards))
    }

    pub fn pool(&self, pool_id: usize) -> Result<&Pool, LedgerError> {
        self.state.pools.get(pool_id)
    }

    /// Pool book as if settled now.
    pub fn projected_pools(&self) -> Result<PoolBook, LedgerError> {
        let mut pools = self.state.pools.clone();
        pools.settle(self.state.global.total_deposit, &self.clock, self.time.now())?;
        Ok(pools)
    }

    pub fn pools(&self) -> &[Pool] {
        self.state.pools.pools()
    }

    pub fn global(&self) -> &GlobalState {
        &self.state.global
    }

    pub fn session(&self) -> &CriteriaUpdateSession {
        &self.state.session
    }

    pub fn total_deposit(&self) -> u128 {
        self.state.global.total_deposit
    }

    pub fn investor_count(&self) -> u64 {
        self.state.global.investor_count
    }

    pub fn whitelisted_count(&self) -> u64 {
        self.state.global.whitelisted_count
    }

    pub fn deposit_fee_bp(&self) -> u64 {
        self.state.deposit_fee_bp
    }

    pub fn claim_fee_bp(&self) -> u64 {
        self.state.claim_fee_bp
    }

    pub fn is_criteria_update_active(&self) -> bool {
        self.state.session.is_active
    }

    pub fn is_member(&self, addr: &Address, pool_id: usize) -> bool {
        self.state.accounts.get(addr).is_some_and(|a| a.is_member(pool_id))
    }

    /// Whether `addr` belongs to the whitelist-only pool `pool_id`.
    pub fn is_whitelisted(&self, addr: &Address, pool_id: usize) -> bool {
        self.state
            .pools
            .get(pool_id)
            .is_ok_and(|p| p.is_whitelist_only())
            && self.is_member(addr, pool_id)
    }

    /// Pool accumulator value up to which `addr` has been credited.
    pub fn pool_checkpoint(&self, addr: &Address, pool_id: usize) -> Option<u128> {
        self.state
            .accounts
            .get(addr)
            .and_then(|a| a.positions.get(pool_id))
            .map(|p| p.reward_per_share_paid)
    }
}

fn apply_deposit(
    journal: &mut Journal<'_>,
    caller: &Address,
    net: u128,
    fee: u128,
    first_deposit: bool,
    referrer: Option<Address>,
    p: &Propagation<'_>,
) -> Result<Vec<usize>, LedgerError> {
    journal.settle_pools(p.clock, p.now)?;
    journal.ensure_account(caller, p.clock, p.now);
    journal.settle(caller, p.rates, p.clock, p.now)?;

    let new_referral = match referrer {
        Some(r) if first_deposit => journal.attach_referrer(caller, &r, p)?,
        _ => false,
    };

    let global = &mut journal.state.global;
    global.total_deposit = global
        .total_deposit
        .checked_add(net)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    global.pending_fees = global
        .pending_fees
        .checked_add(fee)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    if first_deposit {
        global.investor_count += 1;
    }

    if let Some(acct) = journal.state.accounts.get_mut(caller) {
        acct.total_investment = acct
            .total_investment
            .checked_add(net)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if first_deposit {
            acct.first_deposit_at = Some(p.now);
        }
        acct.last_deposit_at = Some(p.now);
    }

    let direct = journal.propagate_deposit(caller, net, new_referral, p)?;
    let total = journal.state.global.total_deposit;
    journal.state.pools.refresh_current(total)?;

    let joined = journal.join_qualifying_pools(caller)?;
    if let Some(direct) = direct {
        journal.join_qualifying_pools(&direct)?;
    }
    Ok(joined)
}

fn apply_claim(
    journal: &mut Journal<'_>,
    caller: &Address,
    claim_fee_bp: u64,
    min_claim: u128,
    reinvest_percent: u64,
    p: &Propagation<'_>,
) -> Result<ClaimReceipt, LedgerError> {
    journal.settle_pools(p.clock, p.now)?;
    journal.settle(caller, p.rates, p.clock, p.now)?;

    let claimed = journal
        .state
        .accounts
        .get(caller)
        .map_or(0, |a| a.accumulated_reward);
    if claimed < min_claim {
        return Err(LedgerError::ClaimBelowMinimum { amount: claimed, minimum: min_claim });
    }

    let (fee, rest) = withhold(claimed, claim_fee_bp)?;
    let reinvested = rest
        .checked_mul(reinvest_percent as u128)
        .ok_or(LedgerError::ArithmeticOverflow)?
        / 100;
    let paid_out = rest - reinvested;

    if let Some(acct) = journal.state.accounts.get_mut(caller) {
        acct.accumulated_reward = 0;
        acct.total_investment = acct
            .total_investment
            .checked_add(reinvested)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        acct.last_claim_at = Some(p.now);
    }

    let global = &mut journal.state.global;
    global.total_deposit = global
        .total_deposit
        .checked_add(reinvested)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    global.pending_fees = global
        .pending_fees
        .checked_add(fee)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let total = global.total_deposit;
    journal.state.pools.refresh_current(total)?;
    journal.join_qualifying_pools(caller)?;

    Ok(ClaimReceipt { claimed, fee, reinvested, paid_out })
}

fn apply_criteria(
    journal: &mut Journal<'_>,
    staged: Option<Vec<(usize, PoolCriteria)>>,
    sweep_batch: usize,
    rates: &RateTable,
    clock: &RoundClock,
    now: u64,
) -> Result<SweepProgress, LedgerError> {
    if let Some(staged) = staged {
        let pools: Vec<usize> = staged.iter().map(|(id, _)| *id).collect();
        info!(?pools, sweep_batch, "criteria update proposed");
        journal.open_session(staged);
    }
    if sweep_batch == 0 {
        let registry_len = journal.state.registry.len();
        return Ok(SweepProgress { visited: 0, cursor: 0, registry_len, completed: false });
    }
    journal.settle_pools(clock, now)?;
    journal.sweep(sweep_batch, rates, clock, now)
}

fn apply_whitelist(
    journal: &mut Journal<'_>,
    account: &Address,
    pool_id: usize,
    enabled: bool,
    clock: &RoundClock,
    now: u64,
) -> Result<(), LedgerError> {
    journal.settle_pools(clock, now)?;
    journal.ensure_account(account, clock, now);

    let state = &mut *journal.state;
    let whitelist_ids: Vec<usize> = state
        .pools
        .pools()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_whitelist_only())
        .map(|(id, _)| id)
        .collect();
    let acct = state
        .accounts
        .get_mut(account)
        .ok_or(LedgerError::UnknownAccount(*account))?;
    let was_whitelisted = whitelist_ids.iter().any(|&id| acct.is_member(id));
    let is_member = acct.is_member(pool_id);

    if enabled {
        if is_member {
            return Err(LedgerError::InvestorAlreadyWhitelisted { pool_id });
        }
        let total = state.global.total_deposit;
        let position = acct
            .positions
            .get_mut(pool_id)
            .ok_or(LedgerError::InvalidPoolId(pool_id))?;
        state.pools.join(pool_id, position, total)?;
        if !was_whitelisted {
            state.global.whitelisted_count += 1;
        }
    } else {
        if !is_member {
            return Err(LedgerError::InvestorNotWhitelisted { pool_id });
        }
        crate::settlement::credit_pool_positions(acct, &state.pools)?;
        let position = acct
            .positions
            .get_mut(pool_id)
            .ok_or(LedgerError::InvalidPoolId(pool_id))?;
        state.pools.leave(pool_id, position)?;
        let still_whitelisted = whitelist_ids.iter().any(|&id| acct.is_member(id));
        if !still_whitelisted {
            state.global.whitelisted_count = state.global.whitelisted_count.saturating_sub(1);
        }
    }
    Ok(())
}
