//! Shared race types.
//!
//! These are the values that flow between the resampler, the candidate set,
//! the evaluator and the race controller. Most are plain data and cheap to
//! clone; the dataset itself is only ever borrowed.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::TaskKind;

/// Stable identifier of a candidate (its position in the candidate set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identifier of a partition (its position in the resampler output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub usize);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:02}", self.0)
    }
}

/// One train/validation split, as row indices into the dataset.
///
/// Bootstrap training sets contain repeated indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: PartitionId,
    pub label: String,
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// How partitions are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Training rows drawn with replacement; validation is out-of-bag.
    Bootstrap,
    /// Disjoint folds; validation is one fold, training the rest.
    Kfold,
}

/// Supported algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    /// Ridge regression, or ridge-penalized logistic regression.
    Linear,
    Knn,
    Tree,
    Forest,
}

impl AlgorithmKind {
    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::Linear => "linear",
            AlgorithmKind::Knn => "knn",
            AlgorithmKind::Tree => "tree",
            AlgorithmKind::Forest => "forest",
        }
    }
}

/// Neighbour vote weighting for k-NN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KnnWeighting {
    Uniform,
    InverseDistance,
}

/// A concrete parameter assignment for one algorithm.
///
/// Each variant is the full tunable surface of its algorithm; values are
/// validated when the candidate set is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum Params {
    Linear {
        penalty: f64,
    },
    Knn {
        neighbors: usize,
        weighting: KnnWeighting,
    },
    Tree {
        max_depth: usize,
        min_leaf: usize,
    },
    Forest {
        trees: usize,
        max_depth: usize,
        min_leaf: usize,
        /// Share of features considered at each split, in `(0, 1]`.
        feature_fraction: f64,
    },
}

impl Params {
    pub fn algorithm(&self) -> AlgorithmKind {
        match self {
            Params::Linear { .. } => AlgorithmKind::Linear,
            Params::Knn { .. } => AlgorithmKind::Knn,
            Params::Tree { .. } => AlgorithmKind::Tree,
            Params::Forest { .. } => AlgorithmKind::Forest,
        }
    }

    /// Check value domains. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Params::Linear { penalty } => {
                if !(penalty.is_finite() && penalty >= 0.0) {
                    return Err(format!("penalty must be finite and >= 0, got {penalty}"));
                }
            }
            Params::Knn { neighbors, .. } => {
                if neighbors == 0 {
                    return Err("neighbors must be >= 1".to_string());
                }
            }
            Params::Tree {
                max_depth,
                min_leaf,
            } => {
                if max_depth == 0 || min_leaf == 0 {
                    return Err("max_depth and min_leaf must be >= 1".to_string());
                }
            }
            Params::Forest {
                trees,
                max_depth,
                min_leaf,
                feature_fraction,
            } => {
                if trees == 0 || max_depth == 0 || min_leaf == 0 {
                    return Err("trees, max_depth and min_leaf must be >= 1".to_string());
                }
                if !(feature_fraction > 0.0 && feature_fraction <= 1.0) {
                    return Err(format!(
                        "feature_fraction must be in (0, 1], got {feature_fraction}"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::Linear { penalty } => write!(f, "linear(penalty={penalty:.4e})"),
            Params::Knn {
                neighbors,
                weighting,
            } => {
                let w = match weighting {
                    KnnWeighting::Uniform => "uniform",
                    KnnWeighting::InverseDistance => "inverse-distance",
                };
                write!(f, "knn(k={neighbors}, {w})")
            }
            Params::Tree {
                max_depth,
                min_leaf,
            } => write!(f, "tree(depth={max_depth}, min_leaf={min_leaf})"),
            Params::Forest {
                trees,
                max_depth,
                min_leaf,
                feature_fraction,
            } => write!(
                f,
                "forest(trees={trees}, depth={max_depth}, min_leaf={min_leaf}, mtry={feature_fraction:.2})"
            ),
        }
    }
}

/// One algorithm plus one concrete parameter assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub params: Params,
}

/// Scoring metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    Rmse,
    Mae,
    Rsq,
    RocAuc,
    Accuracy,
    LogLoss,
}

/// Whether smaller or larger metric values are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Direction {
    /// Map a metric so that smaller is always better.
    pub fn orient(self, value: f64) -> f64 {
        match self {
            Direction::LowerIsBetter => value,
            Direction::HigherIsBetter => -value,
        }
    }
}

impl MetricKind {
    pub fn direction(self) -> Direction {
        match self {
            MetricKind::Rmse | MetricKind::Mae | MetricKind::LogLoss => Direction::LowerIsBetter,
            MetricKind::Rsq | MetricKind::RocAuc | MetricKind::Accuracy => {
                Direction::HigherIsBetter
            }
        }
    }

    pub fn task(self) -> TaskKind {
        match self {
            MetricKind::Rmse | MetricKind::Mae | MetricKind::Rsq => TaskKind::Regression,
            MetricKind::RocAuc | MetricKind::Accuracy | MetricKind::LogLoss => {
                TaskKind::Classification
            }
        }
    }

    pub fn default_for(task: TaskKind) -> Self {
        match task {
            TaskKind::Regression => MetricKind::Rmse,
            TaskKind::Classification => MetricKind::RocAuc,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::Rmse => "RMSE",
            MetricKind::Mae => "MAE",
            MetricKind::Rsq => "R²",
            MetricKind::RocAuc => "ROC AUC",
            MetricKind::Accuracy => "Accuracy",
            MetricKind::LogLoss => "Log-loss",
        }
    }
}

/// Result of one evaluator call.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Scored(f64),
    /// The learner failed; the cause is kept for diagnostics.
    Failed(String),
}

/// One candidate scored on one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub candidate: CandidateId,
    pub params: Params,
    pub partition: PartitionId,
    pub outcome: TrialOutcome,
    pub elapsed: Duration,
}

impl Trial {
    pub fn metric(&self) -> Option<f64> {
        match self.outcome {
            TrialOutcome::Scored(v) => Some(v),
            TrialOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, TrialOutcome::Failed(_))
    }
}

/// Statistical test used to eliminate candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EliminationTest {
    /// Additive two-way model (candidate + partition) with pooled residual
    /// variance, as in repeated-measures ANOVA racing.
    Anova,
    /// Paired t-test of each candidate against the current best.
    PairedT,
}

/// Why a candidate left the race.
#[derive(Debug, Clone, PartialEq)]
pub enum EliminationReason {
    /// Significantly worse than the best candidate.
    Statistical { p_value: f64, gap: f64 },
    /// No evaluator call for this candidate ever produced a score.
    Failure { failures: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Elimination {
    pub candidate: CandidateId,
    /// 1-based round after which the candidate was removed.
    pub round: usize,
    pub reason: EliminationReason,
}

/// A partition that failed its pre-check and was skipped for everyone.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPartition {
    pub partition: PartitionId,
    pub cause: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_compactly() {
        assert_eq!(CandidateId(4).to_string(), "#4");
        assert_eq!(PartitionId(3).to_string(), "P03");
    }

    #[test]
    fn params_validation_rejects_out_of_domain_values() {
        assert!(Params::Linear { penalty: -1.0 }.validate().is_err());
        assert!(
            Params::Knn {
                neighbors: 0,
                weighting: KnnWeighting::Uniform
            }
            .validate()
            .is_err()
        );
        assert!(
            Params::Forest {
                trees: 10,
                max_depth: 3,
                min_leaf: 1,
                feature_fraction: 1.5
            }
            .validate()
            .is_err()
        );
        assert!(Params::Tree { max_depth: 4, min_leaf: 2 }.validate().is_ok());
    }

    #[test]
    fn orientation_makes_smaller_better() {
        assert_eq!(MetricKind::Rmse.direction().orient(2.0), 2.0);
        assert_eq!(MetricKind::RocAuc.direction().orient(0.8), -0.8);
    }
}
