//! Pillar ledger simulator.
//!
//! Replays a JSON scenario of deposits, claims and administrative calls
//! against an in-memory ledger on a simulated clock, then prints a JSON
//! report. The final state can be saved as a snapshot and inspected later.

mod report;
mod scenario;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use pillar_core::clock::ManualClock;
use pillar_core::transfer::MemoryTransfer;
use pillar_engine::{Ledger, LedgerSnapshot};

use report::Report;
use scenario::{Scenario, Simulation};
use settings::SimSettings;

#[derive(Parser, Debug)]
#[command(name = "pillar-sim", version, about = "Replay ledger scenarios against an in-memory Pillar ledger")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario and print the resulting state.
    Run(RunArgs),
    /// Print the state stored in a snapshot file.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario file (JSON)
    #[arg(long)]
    scenario: PathBuf,

    /// Settings file (TOML); defaults to the user config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the final ledger state to this snapshot file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Stop at the first failing step
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Snapshot file written by `run --snapshot`
    #[arg(long)]
    snapshot: PathBuf,

    /// Project rewards to this time instead of the last settled round
    #[arg(long)]
    at: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Inspect(args) => inspect(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let settings = SimSettings::load(args.settings.as_deref())?;
    let config = settings.ledger_config()?;
    let scenario = Scenario::load(&args.scenario)?;
    info!(steps = scenario.steps.len(), start = config.start_time, "replaying scenario");

    let mut sim = Simulation::new(config)?;
    sim.replay(&scenario, args.strict)?;

    if let Some(path) = &args.snapshot {
        sim.ledger
            .snapshot()
            .save(path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot saved");
    }

    let outcomes = std::mem::take(&mut sim.outcomes);
    let report = Report::build(&sim.ledger, &sim.labels, outcomes)?;
    println!("{}", report.to_json()?);
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let snapshot = LedgerSnapshot::load(&args.snapshot)
        .with_context(|| format!("failed to read snapshot {}", args.snapshot.display()))?;
    let settled = snapshot.state.pools().last_settlement();
    let clock = ManualClock::new(args.at.unwrap_or(settled).max(settled));
    let ledger = Ledger::restore(snapshot, MemoryTransfer::new(), clock)
        .context("snapshot does not describe a valid ledger")?;

    let report = Report::build(&ledger, &Default::default(), Vec::new())?;
    println!("{}", report.to_json()?);
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr so the report on
/// stdout stays machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
