use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "attest",
    version,
    about = "Statistical reliability testing for non-deterministic systems"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a probabilistic check of a command SUT
    Run(RunArgs),
    /// Power-analysis sample sizing
    Plan(PlanArgs),
    /// Can (samples, target rate, confidence) ever verify?
    Feasibility(FeasibilityArgs),
    /// Inspect or validate persisted execution specs
    Spec(SpecArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Check file (YAML)
    #[arg(long)]
    pub check: PathBuf,
    /// Write a machine-readable summary JSON here
    #[arg(long)]
    pub summary: Option<PathBuf>,
    /// Measure a baseline instead of testing: emit an execution spec
    #[arg(long)]
    pub measure: bool,
    /// Where the measured spec is written (with --measure)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Expiration window for the measured spec, in days
    #[arg(long)]
    pub expire_days: Option<u32>,
    /// Repeat the check this many times and summarize across runs
    #[arg(long, default_value_t = 1)]
    pub runs: u32,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Baseline pass rate p₀
    #[arg(long)]
    pub baseline_rate: f64,
    /// Smallest degradation δ the test must detect
    #[arg(long)]
    pub min_detectable_effect: f64,
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,
    #[arg(long, default_value_t = 0.80)]
    pub power: f64,
}

#[derive(Args)]
pub struct FeasibilityArgs {
    #[arg(long)]
    pub samples: u64,
    #[arg(long)]
    pub target_rate: f64,
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,
}

#[derive(Args)]
pub struct SpecArgs {
    #[command(subcommand)]
    pub cmd: SpecCommand,
}

#[derive(Subcommand)]
pub enum SpecCommand {
    /// Print a persisted spec
    Show {
        #[arg(long)]
        path: PathBuf,
    },
    /// Check expiration and factor consistency against a check file
    Validate {
        #[arg(long)]
        path: PathBuf,
        /// Check file whose inputs act as the test-time factor source
        #[arg(long)]
        check: Option<PathBuf>,
    },
}
