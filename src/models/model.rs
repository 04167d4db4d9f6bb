//! Learner dispatch.
//!
//! Every algorithm sits behind the same contract: fit on encoded rows plus a
//! numeric target, then predict one value per row. For classification the
//! target is `0.0`/`1.0` and predictions are probabilities of the positive
//! class; for regression both are on the target scale.

use serde::{Deserialize, Serialize};

use crate::domain::{Params, TaskKind};
use crate::models::knn::KnnModel;
use crate::models::linear::{LinearModel, fit_logistic, fit_ridge};
use crate::models::tree::{ForestModel, TreeModel, TreeSettings};

/// Why a learner could not produce a usable model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("empty training set")]
    EmptyTrainingSet,
    #[error("singular design matrix")]
    Singular,
    #[error("no convergence after {0} iterations")]
    NonConvergence(usize),
    #[error("classes are perfectly separated; add a penalty")]
    Separation,
    #[error("non-finite values in data or predictions")]
    NonFinite,
    #[error("degenerate data: {0}")]
    Degenerate(String),
}

/// Per-fit inputs that are not part of the candidate's parameters.
#[derive(Debug, Clone, Copy)]
pub struct FitContext {
    pub task: TaskKind,
    /// Seed for stochastic learners (forests).
    pub seed: u64,
}

/// A fitted learner of any supported algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum FittedModel {
    Linear(LinearModel),
    Knn(KnnModel),
    Tree(TreeModel),
    Forest(ForestModel),
}

impl FittedModel {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            FittedModel::Linear(m) => m.predict_row(row),
            FittedModel::Knn(m) => m.predict_row(row),
            FittedModel::Tree(m) => m.predict_row(row),
            FittedModel::Forest(m) => m.predict_row(row),
        }
    }

    /// Predict every row; any non-finite prediction is an error.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, FitError> {
        let out: Vec<f64> = rows.iter().map(|r| self.predict_row(r)).collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }
        Ok(out)
    }
}

/// Fit the learner described by `params`.
pub fn fit(
    params: &Params,
    rows: &[Vec<f64>],
    y: &[f64],
    ctx: &FitContext,
) -> Result<FittedModel, FitError> {
    if rows.is_empty() {
        return Err(FitError::EmptyTrainingSet);
    }
    if rows.len() != y.len() {
        return Err(FitError::Degenerate(format!(
            "{} rows but {} targets",
            rows.len(),
            y.len()
        )));
    }
    if y.iter().chain(rows.iter().flatten()).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let model = match *params {
        Params::Linear { penalty } => match ctx.task {
            TaskKind::Regression => FittedModel::Linear(fit_ridge(rows, y, penalty)?),
            TaskKind::Classification => FittedModel::Linear(fit_logistic(rows, y, penalty)?),
        },
        Params::Knn {
            neighbors,
            weighting,
        } => FittedModel::Knn(KnnModel::fit(rows, y, neighbors, weighting)),
        Params::Tree {
            max_depth,
            min_leaf,
        } => {
            let settings = TreeSettings {
                max_depth,
                min_leaf,
                feature_fraction: 1.0,
            };
            FittedModel::Tree(TreeModel::fit(rows, y, &settings, ctx.seed))
        }
        Params::Forest {
            trees,
            max_depth,
            min_leaf,
            feature_fraction,
        } => {
            let settings = TreeSettings {
                max_depth,
                min_leaf,
                feature_fraction,
            };
            FittedModel::Forest(ForestModel::fit(rows, y, trees, &settings, ctx.seed))
        }
    };
    Ok(model)
}

/// Derive an independent seed for `stream` from `base` (splitmix64 finalizer).
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
