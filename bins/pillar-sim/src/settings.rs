//! Simulator settings.
//!
//! Loaded from an optional TOML file, then overridden by `PILLAR_*`
//! environment variables (for example `PILLAR_DEPOSIT_FEE_BP=0`). Every
//! field has a default matching the reference deployment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pillar_core::address::Address;
use pillar_core::config::LedgerConfig;
use pillar_core::constants::{
    DEFAULT_CLAIM_FEE_BP, DEFAULT_CRITERIA_UPDATE_DELAY, DEFAULT_DEPOSIT_DELAY,
    DEFAULT_DEPOSIT_FEE_BP, DEFAULT_REINVEST_PERCENT, DEFAULT_ROUND_DURATION,
    DEFAULT_TREASURY_SHARE_PERCENT,
};
use pillar_core::units::parse_tokens;

/// Default start time of a simulated ledger (2023-11-14T22:13:20Z).
pub const DEFAULT_START_TIME: u64 = 1_700_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub start_time: u64,
    pub round_duration: u64,
    pub deposit_delay: u64,
    pub criteria_update_delay: u64,
    pub deposit_fee_bp: u64,
    pub claim_fee_bp: u64,
    /// Decimal token amount, e.g. `"1"` or `"0.5"`.
    pub min_deposit: String,
    pub min_claim: String,
    pub reinvest_percent: u64,
    pub treasury_share_percent: u64,
    /// Account labels or `0x` addresses.
    pub admin: String,
    pub treasury: String,
    pub treasury2: String,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            start_time: DEFAULT_START_TIME,
            round_duration: DEFAULT_ROUND_DURATION,
            deposit_delay: DEFAULT_DEPOSIT_DELAY,
            criteria_update_delay: DEFAULT_CRITERIA_UPDATE_DELAY,
            deposit_fee_bp: DEFAULT_DEPOSIT_FEE_BP,
            claim_fee_bp: DEFAULT_CLAIM_FEE_BP,
            min_deposit: "1".to_string(),
            min_claim: "1".to_string(),
            reinvest_percent: DEFAULT_REINVEST_PERCENT,
            treasury_share_percent: DEFAULT_TREASURY_SHARE_PERCENT,
            admin: "admin".to_string(),
            treasury: "treasury".to_string(),
            treasury2: "treasury2".to_string(),
        }
    }
}

impl SimSettings {
    /// Load settings from `path` (if given and present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_settings_path);
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(config::Environment::with_prefix("PILLAR").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        settings
            .try_deserialize()
            .context("invalid simulator settings")
    }

    /// Build and validate the ledger configuration.
    pub fn ledger_config(&self) -> Result<LedgerConfig> {
        let mut cfg = LedgerConfig::new(
            self.start_time,
            resolve_account(&self.admin)?,
            resolve_account(&self.treasury)?,
            resolve_account(&self.treasury2)?,
        );
        cfg.round_duration = self.round_duration;
        cfg.deposit_delay = self.deposit_delay;
        cfg.criteria_update_delay = self.criteria_update_delay;
        cfg.deposit_fee_bp = self.deposit_fee_bp;
        cfg.claim_fee_bp = self.claim_fee_bp;
        cfg.min_deposit = parse_tokens(&self.min_deposit).context("min_deposit")?;
        cfg.min_claim = parse_tokens(&self.min_claim).context("min_claim")?;
        cfg.reinvest_percent = self.reinvest_percent;
        cfg.treasury_share_percent = self.treasury_share_percent;
        cfg.validate().context("invalid ledger configuration")?;
        Ok(cfg)
    }
}

/// `~/.config/pillar/sim.toml` or `./pillar-sim.toml`.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("pillar").join("sim.toml"))
        .unwrap_or_else(|| PathBuf::from("pillar-sim.toml"))
}

/// Resolve a `0x` address or derive one from a label.
pub fn resolve_account(name: &str) -> Result<Address> {
    if name.starts_with("0x") {
        return name
            .parse()
            .with_context(|| format!("invalid address {name}"));
    }
    Ok(Address::from_label(name))
}
