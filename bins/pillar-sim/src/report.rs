//! JSON reports of ledger state.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use pillar_core::address::Address;
use pillar_core::traits::{Clock, ValueTransfer};
use pillar_core::units::format_tokens;
use pillar_engine::Ledger;

use crate::scenario::StepOutcome;

#[derive(Debug, Serialize)]
pub struct Report {
    pub now: u64,
    pub round: u64,
    pub total_deposit: String,
    pub investor_count: u64,
    pub whitelisted_count: u64,
    pub pending_fees: String,
    pub deposit_fee_bp: u64,
    pub claim_fee_bp: u64,
    pub criteria_update_active: bool,
    pub accounts: Vec<AccountReport>,
    pub pools: Vec<PoolReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepOutcome>,
}

#[derive(Debug, Serialize)]
pub struct AccountReport {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub total_investment: String,
    /// Claimable now, including rounds not yet settled.
    pub accumulated_reward: String,
    pub referrer: Option<Address>,
    pub direct_refs: u64,
    pub downline_refs: u64,
    pub total_direct_investment: String,
    pub total_downline_investment: String,
    pub pools: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct PoolReport {
    pub id: usize,
    pub whitelist_only: bool,
    pub active: bool,
    pub members: u64,
    pub last_round_reward: String,
    pub current_round_reward: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_direct_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_refs_required: Option<u64>,
}

impl Report {
    /// Snapshot `ledger` as of its clock, settling projections in memory.
    pub fn build<T: ValueTransfer, C: Clock>(
        ledger: &Ledger<T, C>,
        labels: &BTreeMap<Address, String>,
        steps: Vec<StepOutcome>,
    ) -> Result<Self> {
        let now = ledger.now();
        let mut accounts = Vec::new();
        for (addr, _) in ledger.state().accounts() {
            let Some(acct) = ledger.projected_account(addr)? else {
                continue;
            };
            accounts.push(AccountReport {
                address: *addr,
                label: labels.get(addr).cloned(),
                total_investment: format_tokens(acct.total_investment),
                accumulated_reward: format_tokens(acct.accumulated_reward),
                referrer: acct.referrer,
                direct_refs: acct.direct_refs_count,
                downline_refs: acct.downline_refs_count,
                total_direct_investment: format_tokens(acct.total_direct_investment),
                total_downline_investment: format_tokens(acct.total_downline_investment),
                pools: acct.member_pools().collect(),
            });
        }

        let pools = ledger
            .projected_pools()?
            .pools()
            .iter()
            .enumerate()
            .map(|(id, p)| PoolReport {
                id,
                whitelist_only: p.is_whitelist_only(),
                active: p.is_active,
                members: p.member_count,
                last_round_reward: format_tokens(p.last_round_reward),
                current_round_reward: format_tokens(p.current_round_reward),
                personal_required: p.criteria.map(|c| format_tokens(c.personal_invest_required)),
                total_direct_required: p.criteria.map(|c| format_tokens(c.total_direct_invest_required)),
                direct_refs_required: p.criteria.map(|c| c.direct_refs_required),
            })
            .collect();

        let global = ledger.global();
        Ok(Self {
            now,
            round: ledger.round_clock().round_index(now),
            total_deposit: format_tokens(global.total_deposit),
            investor_count: global.investor_count,
            whitelisted_count: global.whitelisted_count,
            pending_fees: format_tokens(global.pending_fees),
            deposit_fee_bp: ledger.deposit_fee_bp(),
            claim_fee_bp: ledger.claim_fee_bp(),
            criteria_update_active: ledger.is_criteria_update_active(),
            accounts,
            pools,
            steps,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
