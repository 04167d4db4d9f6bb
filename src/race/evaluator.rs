//! Scoring one candidate on one partition.

use std::time::Instant;

use crate::domain::{
    Candidate, Dataset, MetricKind, Partition, PartitionId, TaskKind, Trial, TrialOutcome,
};
use crate::error::RaceError;
use crate::math::metrics;
use crate::models::{FeatureEncoder, FitContext, FitError, derive_seed, fit};

/// Anything that can turn a (candidate, partition) pair into a trial.
///
/// Implementations are shared across worker threads and must not keep
/// mutable state between calls. A learner failure is a `Failed` trial, never
/// a panic or an early return.
pub trait Evaluate: Sync {
    fn evaluate(&self, candidate: &Candidate, partition: &Partition) -> Trial;

    /// Reject a partition nobody can be scored on. Called once per partition
    /// before any candidate is evaluated on it.
    fn check_partition(&self, _partition: &Partition) -> Result<(), RaceError> {
        Ok(())
    }
}

/// Fits real learners on a borrowed dataset.
#[derive(Debug, Clone, Copy)]
pub struct ModelEvaluator<'a> {
    dataset: &'a Dataset,
    metric: MetricKind,
    seed: u64,
}

impl<'a> ModelEvaluator<'a> {
    pub fn new(dataset: &'a Dataset, metric: MetricKind, seed: u64) -> Self {
        Self {
            dataset,
            metric,
            seed,
        }
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    fn score(&self, candidate: &Candidate, partition: &Partition) -> Result<f64, FitError> {
        let records = self.dataset.records();
        let targets = self.dataset.targets();

        let encoder = FeatureEncoder::fit(self.dataset.schema(), records, &partition.train);
        let x_train = encoder.encode(records, &partition.train);
        let y_train: Vec<f64> = partition.train.iter().map(|&r| targets[r]).collect();
        let ctx = FitContext {
            task: self.dataset.task(),
            seed: trial_seed(self.seed, candidate, partition.id),
        };
        let model = fit(&candidate.params, &x_train, &y_train, &ctx)?;

        let x_val = encoder.encode(records, &partition.validation);
        let y_val: Vec<f64> = partition.validation.iter().map(|&r| targets[r]).collect();
        let predicted = model.predict(&x_val)?;
        let value = metrics::score(self.metric, &y_val, &predicted);
        if !value.is_finite() {
            return Err(FitError::Degenerate(format!(
                "{} is undefined on this validation set",
                self.metric.display_name()
            )));
        }
        Ok(value)
    }
}

impl Evaluate for ModelEvaluator<'_> {
    fn evaluate(&self, candidate: &Candidate, partition: &Partition) -> Trial {
        let started = Instant::now();
        let outcome = match self.score(candidate, partition) {
            Ok(value) => TrialOutcome::Scored(value),
            Err(err) => TrialOutcome::Failed(err.to_string()),
        };
        Trial {
            candidate: candidate.id,
            params: candidate.params.clone(),
            partition: partition.id,
            outcome,
            elapsed: started.elapsed(),
        }
    }

    fn check_partition(&self, partition: &Partition) -> Result<(), RaceError> {
        check_partition(self.dataset, self.metric, partition)
    }
}

/// Seed for one (candidate, partition) fit, independent of scheduling.
pub fn trial_seed(race_seed: u64, candidate: &Candidate, partition: PartitionId) -> u64 {
    derive_seed(derive_seed(race_seed, candidate.id.0 as u64), partition.0 as u64)
}

/// Problems with a partition that would fail every candidate alike.
pub fn check_partition(
    dataset: &Dataset,
    metric: MetricKind,
    partition: &Partition,
) -> Result<(), RaceError> {
    let fail = |cause: String| RaceError::PartitionError {
        partition: partition.id,
        cause,
    };

    if partition.train.is_empty() {
        return Err(fail("empty training subset".to_string()));
    }
    if partition.validation.is_empty() {
        return Err(fail("empty validation subset".to_string()));
    }
    let n = dataset.len();
    if let Some(row) = partition
        .train
        .iter()
        .chain(&partition.validation)
        .find(|&&r| r >= n)
    {
        return Err(fail(format!("row {row} is outside the dataset ({n} rows)")));
    }

    let targets = dataset.targets();
    let train_y: Vec<f64> = partition.train.iter().map(|&r| targets[r]).collect();
    match dataset.task() {
        TaskKind::Regression => {
            let first = train_y[0];
            if train_y.iter().all(|&y| y == first) {
                return Err(fail(format!("training target is constant ({first})")));
            }
        }
        TaskKind::Classification => {
            if !has_both_classes(&train_y) {
                return Err(fail("training subset holds a single class".to_string()));
            }
            if metric == MetricKind::RocAuc {
                let val_y: Vec<f64> = partition.validation.iter().map(|&r| targets[r]).collect();
                if !has_both_classes(&val_y) {
                    return Err(fail(
                        "validation subset holds a single class; ROC AUC is undefined".to_string(),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn has_both_classes(y: &[f64]) -> bool {
    y.iter().any(|&v| v >= 0.5) && y.iter().any(|&v| v < 0.5)
}
