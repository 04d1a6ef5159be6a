//! Scenario files and their replay against an in-memory ledger.
//!
//! A scenario is a JSON document with a list of steps:
//!
//! ```json
//! { "steps": [
//!     { "op": "deposit", "account": "alice", "amount": "10", "referrer": "bob" },
//!     { "op": "advance", "rounds": 4 },
//!     { "op": "claim", "account": "alice" }
//! ] }
//! ```
//!
//! Accounts are labels (hashed into addresses) or `0x` hex addresses.
//! Administrative steps act as the configured admin unless `caller` is set.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pillar_core::address::Address;
use pillar_core::clock::ManualClock;
use pillar_core::config::LedgerConfig;
use pillar_core::rates::PoolCriteria;
use pillar_core::transfer::MemoryTransfer;
use pillar_core::units::{format_tokens, parse_tokens};
use pillar_engine::Ledger;

use crate::settings::resolve_account;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Advance {
        #[serde(default)]
        rounds: u64,
        #[serde(default)]
        seconds: u64,
    },
    SetTime {
        time: u64,
    },
    Deposit {
        account: String,
        amount: String,
        referrer: Option<String>,
    },
    Claim {
        account: String,
    },
    Whitelist {
        account: String,
        pool: usize,
        enabled: bool,
        caller: Option<String>,
    },
    Criteria {
        #[serde(default)]
        pools: Vec<usize>,
        #[serde(default)]
        criteria: Vec<CriteriaSpec>,
        batch: usize,
        caller: Option<String>,
    },
    SetDepositFee {
        fee_bp: u64,
        caller: Option<String>,
    },
    SetClaimFee {
        fee_bp: u64,
        caller: Option<String>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Advance { .. } => "advance",
            Step::SetTime { .. } => "set_time",
            Step::Deposit { .. } => "deposit",
            Step::Claim { .. } => "claim",
            Step::Whitelist { .. } => "whitelist",
            Step::Criteria { .. } => "criteria",
            Step::SetDepositFee { .. } => "set_deposit_fee",
            Step::SetClaimFee { .. } => "set_claim_fee",
        }
    }
}

/// Pool thresholds with decimal token amounts.
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaSpec {
    pub personal: String,
    pub total_direct: String,
    pub direct_refs: u64,
}

impl CriteriaSpec {
    fn to_criteria(&self) -> Result<PoolCriteria> {
        Ok(PoolCriteria::new(
            parse_tokens(&self.personal).context("personal")?,
            parse_tokens(&self.total_direct).context("total_direct")?,
            self.direct_refs,
        ))
    }
}

/// What happened to one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub time: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A ledger on a manual clock, plus the labels seen so far.
pub struct Simulation {
    pub ledger: Ledger<MemoryTransfer, ManualClock>,
    pub transfer: MemoryTransfer,
    pub clock: ManualClock,
    pub labels: BTreeMap<Address, String>,
    pub outcomes: Vec<StepOutcome>,
}

impl Simulation {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let transfer = MemoryTransfer::new();
        let clock = ManualClock::new(config.start_time);
        let mut labels = BTreeMap::new();
        labels.insert(config.admin, "admin".to_string());
        labels.insert(config.treasury, "treasury".to_string());
        labels.insert(config.treasury2, "treasury2".to_string());
        let ledger = Ledger::new(config, transfer.clone(), clock.clone())
            .context("failed to create ledger")?;
        Ok(Self { ledger, transfer, clock, labels, outcomes: Vec::new() })
    }

    fn account(&mut self, name: &str) -> Result<Address> {
        let addr = resolve_account(name)?;
        self.labels.entry(addr).or_insert_with(|| name.to_string());
        Ok(addr)
    }

    fn caller(&mut self, name: Option<&str>) -> Result<Address> {
        match name {
            Some(name) => self.account(name),
            None => Ok(self.ledger.config().admin),
        }
    }

    /// Run every step. With `strict`, stop at the first failing step.
    pub fn replay(&mut self, scenario: &Scenario, strict: bool) -> Result<()> {
        for (index, step) in scenario.steps.iter().enumerate() {
            let time = self.clock_now();
            let outcome = match self.apply(step) {
                Ok(detail) => {
                    info!(index, op = step.name(), time, detail = detail.as_deref().unwrap_or(""), "step ok");
                    StepOutcome { index, op: step.name(), time, ok: true, detail, error: None }
                }
                Err(e) => {
                    warn!(index, op = step.name(), time, error = %e, "step failed");
                    if strict {
                        return Err(e.context(format!("step {index} ({}) failed", step.name())));
                    }
                    StepOutcome {
                        index,
                        op: step.name(),
                        time,
                        ok: false,
                        detail: None,
                        error: Some(format!("{e:#}")),
                    }
                }
            };
            self.outcomes.push(outcome);
        }
        Ok(())
    }

    fn clock_now(&self) -> u64 {
        self.ledger.now()
    }

    fn apply(&mut self, step: &Step) -> Result<Option<String>> {
        match step {
            Step::Advance { rounds, seconds } => {
                let round = self.ledger.config().round_duration;
                let secs = rounds
                    .checked_mul(round)
                    .and_then(|s| s.checked_add(*seconds))
                    .context("advance overflows")?;
                self.clock.advance(secs);
                Ok(None)
            }
            Step::SetTime { time } => {
                if *time < self.clock_now() {
                    bail!("cannot move time backwards to {time}");
                }
                self.clock.set(*time);
                Ok(None)
            }
            Step::Deposit { account, amount, referrer } => {
                let who = self.account(account)?;
                let referrer = referrer.as_deref().map(|r| self.account(r)).transpose()?;
                let amount = parse_tokens(amount).context("amount")?;
                self.transfer.mint(&who, amount);
                let receipt = self.ledger.deposit(&who, amount, referrer)?;
                Ok(Some(format!(
                    "net {} fee {} joined {:?}",
                    format_tokens(receipt.net),
                    format_tokens(receipt.fee),
                    receipt.joined_pools
                )))
            }
            Step::Claim { account } => {
                let who = self.account(account)?;
                let receipt = self.ledger.claim(&who)?;
                Ok(Some(format!(
                    "claimed {} paid {} reinvested {}",
                    format_tokens(receipt.claimed),
                    format_tokens(receipt.paid_out),
                    format_tokens(receipt.reinvested)
                )))
            }
            Step::Whitelist { account, pool, enabled, caller } => {
                let caller = self.caller(caller.as_deref())?;
                let who = self.account(account)?;
                self.ledger.set_whitelist(&caller, &who, *pool, *enabled)?;
                Ok(None)
            }
            Step::Criteria { pools, criteria, batch, caller } => {
                let caller = self.caller(caller.as_deref())?;
                let criteria = criteria
                    .iter()
                    .map(CriteriaSpec::to_criteria)
                    .collect::<Result<Vec<_>>>()?;
                let progress = self.ledger.set_pool_criteria(&caller, pools, &criteria, *batch)?;
                Ok(Some(format!(
                    "swept {} cursor {}/{} completed {}",
                    progress.visited, progress.cursor, progress.registry_len, progress.completed
                )))
            }
            Step::SetDepositFee { fee_bp, caller } => {
                let caller = self.caller(caller.as_deref())?;
                self.ledger.set_deposit_fee(&caller, *fee_bp)?;
                Ok(None)
            }
            Step::SetClaimFee { fee_bp, caller } => {
                let caller = self.caller(caller.as_deref())?;
                self.ledger.set_claim_fee(&caller, *fee_bp)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;

    fn simulation() -> Simulation {
        let settings = SimSettings {
            deposit_fee_bp: 0,
            claim_fee_bp: 0,
            min_claim: "0".to_string(),
            ..SimSettings::default()
        };
        Simulation::new(settings.ledger_config().unwrap()).unwrap()
    }

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn replays_deposit_and_claim() {
        let mut sim = simulation();
        let s = scenario(
            r#"{ "steps": [
                { "op": "deposit", "account": "alice", "amount": "10", "referrer": "bob" },
                { "op": "advance", "rounds": 4 },
                { "op": "claim", "account": "alice" }
            ] }"#,
        );
        sim.replay(&s, true).unwrap();
        assert!(sim.outcomes.iter().all(|o| o.ok));

        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        assert_eq!(sim.transfer.balance_of(&alice), 60_000_000_000_000_000);
        assert_eq!(sim.ledger.account(&bob).unwrap().direct_refs_count, 1);
        assert_eq!(sim.labels.get(&bob).map(String::as_str), Some("bob"));
    }

    #[test]
    fn failures_are_recorded_unless_strict() {
        let s = scenario(
            r#"{ "steps": [
                { "op": "claim", "account": "nobody" },
                { "op": "set_claim_fee", "fee_bp": 100, "caller": "mallory" },
                { "op": "set_deposit_fee", "fee_bp": 100 }
            ] }"#,
        );
        let mut sim = simulation();
        sim.replay(&s, false).unwrap();
        let oks: Vec<bool> = sim.outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(oks, vec![false, false, true]);
        assert_eq!(sim.ledger.deposit_fee_bp(), 100);

        let mut sim = simulation();
        assert!(sim.replay(&s, true).is_err());
        assert!(sim.outcomes.is_empty());
    }

    #[test]
    fn criteria_step_runs_a_sweep() {
        let mut sim = simulation();
        let s = scenario(
            r#"{ "steps": [
                { "op": "deposit", "account": "r", "amount": "300000" },
                { "op": "deposit", "account": "c", "amount": "600000", "referrer": "r" },
                { "op": "criteria", "pools": [0], "batch": 1,
                  "criteria": [{ "personal": "275000", "total_direct": "560000", "direct_refs": 1 }] },
                { "op": "criteria", "batch": 5 }
            ] }"#,
        );
        sim.replay(&s, true).unwrap();
        assert!(!sim.ledger.is_criteria_update_active());
        assert!(sim.ledger.is_member(&Address::from_label("r"), 0));
    }

    #[test]
    fn time_cannot_go_backwards() {
        let mut sim = simulation();
        let s = scenario(r#"{ "steps": [ { "op": "set_time", "time": 5 } ] }"#);
        assert!(sim.replay(&s, true).is_err());
    }
}
