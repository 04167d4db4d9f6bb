//! Command-line parsing for the `race` binary.
//!
//! Parsing and dispatch stay separate from the racing code: every flag here
//! maps onto a `RaceConfig` field (or a file path) in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::SynthKind;
use crate::domain::{EliminationTest, MetricKind, SamplingMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "race",
    version,
    about = "Model selection by racing: cross-validate a hyperparameter grid, dropping losers early"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Race the candidate grid on a CSV, refit the winner and report.
    Run(RunArgs),
    /// Score a CSV with a saved model artifact.
    Predict(PredictArgs),
    /// Print the candidate set a config expands to.
    Grid(GridArgs),
    /// Write a synthetic HR dataset to CSV.
    Synth(SynthArgs),
}

/// Options for `race run`. Unset flags fall back to the config file, then to
/// the built-in defaults.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Input CSV with a header row.
    #[arg(short, long, value_name = "CSV")]
    pub data: PathBuf,

    /// TOML run configuration.
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Target column.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Columns to drop before modelling (repeatable).
    #[arg(long = "exclude", value_name = "COLUMN")]
    pub exclude: Vec<String>,

    #[arg(long, value_enum)]
    pub metric: Option<MetricKind>,

    /// Resampling mode.
    #[arg(long, value_enum)]
    pub mode: Option<SamplingMode>,

    /// Partitions (folds or bootstrap draws).
    #[arg(short = 'k', long)]
    pub partitions: Option<usize>,

    /// k-fold repeats.
    #[arg(long)]
    pub repeats: Option<usize>,

    /// Stratify partitions on the target.
    #[arg(long)]
    pub stratify: Option<bool>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Rounds completed before the first elimination test.
    #[arg(long)]
    pub burn_in: Option<usize>,

    /// Significance level of the elimination test.
    #[arg(long)]
    pub alpha: Option<f64>,

    #[arg(long, value_enum)]
    pub test: Option<EliminationTest>,

    /// Leaderboard rows to print.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write every trial to CSV.
    #[arg(long = "export-trials", value_name = "CSV")]
    pub export_trials: Option<PathBuf>,

    /// Write the refitted winner to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

/// Options for `race predict`.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Model JSON written by `race run --export-model`.
    #[arg(short, long, value_name = "JSON")]
    pub model: PathBuf,

    /// CSV carrying the model's feature columns.
    #[arg(short, long, value_name = "CSV")]
    pub data: PathBuf,

    /// Column copied next to each prediction (for joining back).
    #[arg(long = "id-column")]
    pub id_column: Option<String>,

    /// Output CSV (stdout when omitted).
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for `race grid`.
#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// TOML run configuration; the built-in grids when omitted.
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,
}

/// Options for `race synth`.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[arg(long, value_enum, default_value_t = SynthKind::Wages)]
    pub kind: SynthKind,

    #[arg(short = 'n', long, default_value_t = 500)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "race",
            "run",
            "--data",
            "wages.csv",
            "--target",
            "wage",
            "--mode",
            "kfold",
            "-k",
            "5",
            "--test",
            "paired-t",
            "--alpha",
            "0.1",
            "--exclude",
            "employee_id",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, Some(SamplingMode::Kfold));
        assert_eq!(args.partitions, Some(5));
        assert_eq!(args.test, Some(EliminationTest::PairedT));
        assert_eq!(args.alpha, Some(0.1));
        assert_eq!(args.exclude, vec!["employee_id".to_string()]);
        assert_eq!(args.burn_in, None);
    }

    #[test]
    fn synth_requires_output() {
        assert!(Cli::try_parse_from(["race", "synth", "--kind", "promotion"]).is_err());
    }
}
