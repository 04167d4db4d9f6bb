//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main: parse arguments,
//! set up logging, layer CLI flags over the config file and dispatch.

use std::path::Path;

use clap::Parser;

use crate::cli::{Cli, Command, GridArgs, PredictArgs, RunArgs, SynthArgs};
use crate::domain::{RaceConfig, normalize_name};
use crate::error::AppError;
use crate::grid::build_candidates;

pub mod pipeline;

/// Entry point for the `race` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose).map_err(|e| AppError::new(2, e.to_string()))?;

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Predict(args) => handle_predict(args),
        Command::Grid(args) => handle_grid(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config(&args)?;
    let run = pipeline::race_csv(&config, &args.data)?;

    println!(
        "{}",
        crate::report::format_dataset_summary(&run.ingest, &run.dataset, run.metric)
    );
    println!("{}", crate::report::format_race_summary(&run.outcome));
    println!(
        "{}",
        crate::report::format_leaderboard(&run.outcome.leaderboard, run.metric, args.top)
    );

    // The trials are worth keeping even when nothing survived.
    if let Some(path) = &args.export_trials {
        crate::io::write_trials_csv(path, &run.outcome)?;
        tracing::info!(path = %path.display(), trials = run.outcome.trials.len(), "wrote trials");
    }

    let model = pipeline::finish(&run, config.seed)?;
    println!("{}", crate::report::format_winner(&model));

    if let Some(path) = &args.export_model {
        crate::io::write_model_json(path, &model)?;
        tracing::info!(path = %path.display(), "wrote model");
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let model = crate::io::read_model_json(&args.model)?;
    let ingest = crate::io::load_csv(&args.data, &crate::io::IngestOptions::default())?;
    let records = model.records_from_table(&ingest.table)?;

    let ids = match &args.id_column {
        Some(column) => {
            let name = normalize_name(column);
            let idx = ingest
                .table
                .headers
                .iter()
                .position(|h| *h == name)
                .ok_or_else(|| AppError::new(2, format!("ID column `{name}` not found.")))?;
            let values: Vec<String> = ingest
                .table
                .rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect();
            Some((name, values))
        }
        None => None,
    };
    let ids = ids.as_ref().map(|(name, values)| (name.as_str(), values.as_slice()));

    match &args.output {
        Some(path) => {
            crate::io::write_predictions_csv(path, &model, &records, ids)?;
            tracing::info!(path = %path.display(), rows = records.len(), "wrote predictions");
        }
        None => {
            let writer = csv::Writer::from_writer(std::io::stdout().lock());
            crate::io::write_predictions(writer, &model, &records, ids)
                .map_err(|e| AppError::new(2, format!("Failed to write predictions: {e}")))?;
        }
    }
    Ok(())
}

fn handle_grid(args: GridArgs) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => crate::io::load_config(path)?,
        None => RaceConfig::default(),
    };
    let candidates = build_candidates(&config.algorithm_grids(), config.grid.as_ref(), config.seed)?;
    print!("{}", crate::report::format_candidates(&candidates));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let table = crate::data::generate(args.kind, args.rows, args.seed)?;
    crate::io::write_table_csv(&args.output, &table)?;
    println!(
        "Wrote {} rows to {} (target `{}`, identifier `employee_id`)",
        table.rows.len(),
        args.output.display(),
        args.kind.target()
    );
    Ok(())
}

/// Config file (or defaults) with the run flags layered on top, validated.
pub fn run_config(args: &RunArgs) -> Result<RaceConfig, AppError> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn load_or_default(path: Option<&Path>) -> Result<RaceConfig, AppError> {
    match path {
        Some(path) => crate::io::load_config(path),
        None => Ok(RaceConfig::default()),
    }
}

fn apply_overrides(config: &mut RaceConfig, args: &RunArgs) {
    if let Some(target) = &args.target {
        config.target = target.clone();
    }
    config.exclude.extend(args.exclude.iter().cloned());
    if args.metric.is_some() {
        config.metric = args.metric;
    }
    if let Some(mode) = args.mode {
        config.resample.mode = mode;
    }
    if let Some(k) = args.partitions {
        config.resample.partitions = k;
    }
    if let Some(repeats) = args.repeats {
        config.resample.repeats = repeats;
    }
    if let Some(stratify) = args.stratify {
        config.resample.stratify = stratify;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(burn_in) = args.burn_in {
        config.race.burn_in = burn_in;
    }
    if let Some(alpha) = args.alpha {
        config.race.alpha = alpha;
    }
    if let Some(test) = args.test {
        config.race.test = test;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::{EliminationTest, SamplingMode};

    fn args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["race", "run", "--data", "x.csv"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flags_override_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "target = \"wage\"\nexclude = [\"employee_id\"]\n[resample]\nmode = \"bootstrap\"\npartitions = 8\n[race]\nalpha = 0.1"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = run_config(&args(&[
            "--config",
            &path,
            "--mode",
            "kfold",
            "--test",
            "paired-t",
            "--exclude",
            "notes",
        ]))
        .unwrap();
        assert_eq!(config.target, "wage");
        assert_eq!(config.resample.mode, SamplingMode::Kfold);
        assert_eq!(config.resample.partitions, 8);
        assert_eq!(config.race.alpha, 0.1);
        assert_eq!(config.race.test, EliminationTest::PairedT);
        assert_eq!(config.exclude, vec!["employee_id", "notes"]);
    }

    #[test]
    fn invalid_flags_fail_validation() {
        let err = run_config(&args(&["--target", "wage", "--burn-in", "1"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = run_config(&args(&[])).unwrap_err();
        assert!(err.message().contains("target"));
    }
}
