//! Winner selection and the final refit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Candidate, Dataset, FeatureColumn, MetricKind, RawTable, Record, TargetSpec, TaskKind,
    normalize_name,
};
use crate::error::{FitScope, RaceError};
use crate::models::{FeatureEncoder, FitContext, FittedModel, derive_seed, fit};
use crate::race::{Leaderboard, LeaderboardEntry};

/// Pick the winner: fewest failed trials, then best mean, then lower total
/// cost, then lower id.
///
/// The leaderboard is kept in that order, so this is its head.
pub fn select(leaderboard: &Leaderboard) -> Result<&LeaderboardEntry, RaceError> {
    leaderboard.best().ok_or(RaceError::NoSurvivors {
        candidates: leaderboard.candidates,
        by_failure: leaderboard.eliminated_by_failure,
        by_statistics: leaderboard.eliminated_by_statistics,
    })
}

/// Race statistics carried into the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    pub metric: MetricKind,
    pub mean: f64,
    pub std_err: f64,
    pub scored: usize,
}

/// The selected candidate refitted on every row of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalModel {
    pub created_at: DateTime<Utc>,
    pub candidate: Candidate,
    pub race: RaceSummary,
    pub target: TargetSpec,
    pub schema: Vec<FeatureColumn>,
    pub training_rows: usize,
    encoder: FeatureEncoder,
    model: FittedModel,
}

/// One prediction: a value on the target scale (regression) or the
/// positive-class probability with its label (classification).
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub label: Option<String>,
}

/// Refit the winning candidate on all rows.
pub fn refit(
    winner: &LeaderboardEntry,
    dataset: &Dataset,
    metric: MetricKind,
    seed: u64,
) -> Result<FinalModel, RaceError> {
    let candidate = &winner.candidate;
    let rows: Vec<usize> = (0..dataset.len()).collect();
    let encoder = FeatureEncoder::fit(dataset.schema(), dataset.records(), &rows);
    let x = encoder.encode(dataset.records(), &rows);
    let ctx = FitContext {
        task: dataset.task(),
        seed: derive_seed(seed, candidate.id.0 as u64),
    };
    let model = fit(&candidate.params, &x, dataset.targets(), &ctx).map_err(|e| {
        RaceError::FitError {
            candidate: candidate.id,
            scope: FitScope::FullData,
            cause: e.to_string(),
        }
    })?;

    tracing::info!(
        candidate = %candidate.id,
        params = %candidate.params,
        rows = dataset.len(),
        features = encoder.width(),
        "refitted winner on the full dataset"
    );

    Ok(FinalModel {
        created_at: Utc::now(),
        candidate: candidate.clone(),
        race: RaceSummary {
            metric,
            mean: winner.mean,
            std_err: winner.std_err,
            scored: winner.scored,
        },
        target: dataset.target().clone(),
        schema: dataset.schema().to_vec(),
        training_rows: dataset.len(),
        encoder,
        model,
    })
}

impl FinalModel {
    pub fn feature_names(&self) -> Vec<&str> {
        self.encoder.names()
    }

    /// Predict one record laid out in this model's schema.
    pub fn predict(&self, record: &Record) -> Prediction {
        let value = self.model.predict_row(&self.encoder.encode_record(record));
        let label = match (&self.target.task, &self.target.classes) {
            (TaskKind::Classification, Some(classes)) => {
                Some(classes.label(value >= 0.5).to_string())
            }
            _ => None,
        };
        Prediction { value, label }
    }

    /// Type a raw table against the saved schema. Extra columns (including
    /// the target, if present) are ignored; a missing feature column is an
    /// error.
    pub fn records_from_table(&self, table: &RawTable) -> Result<Vec<Record>, RaceError> {
        let headers: Vec<String> = table.headers.iter().map(|h| normalize_name(h)).collect();
        let positions = self
            .schema
            .iter()
            .map(|col| {
                headers.iter().position(|h| *h == col.name).ok_or_else(|| {
                    RaceError::invalid(format!(
                        "Column `{}` used by the model is missing from the input.",
                        col.name
                    ))
                })
            })
            .collect::<Result<Vec<usize>, RaceError>>()?;

        Ok(table
            .rows
            .iter()
            .map(|row| Record {
                values: self
                    .schema
                    .iter()
                    .zip(&positions)
                    .map(|(col, &idx)| col.parse(row.get(idx).map(String::as_str).unwrap_or("")))
                    .collect(),
            })
            .collect())
    }
}
