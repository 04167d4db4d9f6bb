//! The `race run` workflow, shared by the CLI and the tests:
//!
//! ingest -> type dataset -> candidates -> partitions -> race -> select -> refit
//!
//! The race and the final selection are separate steps so the caller can
//! report (and export) the race even when nothing survives it.

use std::path::Path;

use crate::domain::{Candidate, Dataset, DatasetOptions, MetricKind, RaceConfig};
use crate::error::AppError;
use crate::grid::build_candidates;
use crate::io::{IngestOptions, IngestedTable, load_csv};
use crate::race::{FinalModel, ModelEvaluator, RaceOutcome, WorkerPool, refit, run_race, select};
use crate::resample::{ResampleSpec, resample};

/// Everything computed up to the end of the race.
#[derive(Debug, Clone)]
pub struct RaceRun {
    pub ingest: IngestedTable,
    pub dataset: Dataset,
    pub metric: MetricKind,
    pub candidates: Vec<Candidate>,
    pub outcome: RaceOutcome,
}

/// Load `data` and race the configured grid on it.
pub fn race_csv(config: &RaceConfig, data: &Path) -> Result<RaceRun, AppError> {
    config.validate()?;
    let ingest = load_csv(
        data,
        &IngestOptions {
            target: Some(config.target.clone()),
            task: config.task,
        },
    )?;
    race_table(config, ingest)
}

/// Race on an already ingested table.
pub fn race_table(config: &RaceConfig, ingest: IngestedTable) -> Result<RaceRun, AppError> {
    config.validate()?;
    let dataset = Dataset::from_raw(
        &ingest.table,
        &DatasetOptions {
            target: config.target.clone(),
            exclude: config.exclude.clone(),
            task: config.task,
            positive_class: config.positive_class.clone(),
        },
    )?;
    let metric = config.resolve_metric(dataset.task())?;
    let candidates = build_candidates(&config.algorithm_grids(), config.grid.as_ref(), config.seed)?;
    let partitions = resample(
        &dataset,
        &ResampleSpec::from_config(&config.resample, config.seed),
    )?;
    tracing::info!(
        rows = dataset.len(),
        task = ?dataset.task(),
        metric = metric.display_name(),
        candidates = candidates.len(),
        partitions = partitions.len(),
        "dataset ready"
    );

    let outcome = {
        let evaluator = ModelEvaluator::new(&dataset, metric, config.seed);
        let pool = WorkerPool::new(config.threads)?;
        run_race(
            &candidates,
            &partitions,
            &evaluator,
            &config.race,
            metric.direction(),
            &pool,
        )
    };

    Ok(RaceRun {
        ingest,
        dataset,
        metric,
        candidates,
        outcome,
    })
}

/// Pick the race winner and refit it on every row.
pub fn finish(run: &RaceRun, seed: u64) -> Result<FinalModel, AppError> {
    let winner = select(&run.outcome.leaderboard)?;
    tracing::info!(
        candidate = %winner.candidate.id,
        params = %winner.candidate.params,
        mean = winner.mean,
        "winner selected"
    );
    Ok(refit(winner, &run.dataset, run.metric, seed)?)
}
