//! Run configuration.
//!
//! A `RaceConfig` comes from an optional TOML file with CLI flags layered on
//! top. Every field has a default so an empty file (or no file) is valid as
//! long as a target column is given somewhere.

use serde::{Deserialize, Serialize};

use crate::domain::{EliminationTest, MetricKind, SamplingMode, TaskKind};
use crate::error::RaceError;
use crate::grid::{AlgorithmGrid, GridSample};

/// Resampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub mode: SamplingMode,
    /// Partitions per repeat (`k`).
    pub partitions: usize,
    /// k-fold only: number of independent k-fold rounds.
    pub repeats: usize,
    pub stratify: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Bootstrap,
            partitions: 10,
            repeats: 1,
            stratify: true,
        }
    }
}

/// Racing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Completed rounds before the first elimination test.
    pub burn_in: usize,
    /// One-sided significance level of the elimination test.
    pub alpha: f64,
    pub test: EliminationTest,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            burn_in: 3,
            alpha: 0.05,
            test: EliminationTest::Anova,
        }
    }
}

impl RaceSettings {
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.burn_in < 2 {
            return Err(RaceError::invalid(format!(
                "burn_in must be >= 2 (the elimination test needs paired evidence), got {}",
                self.burn_in
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(RaceError::invalid(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Everything a `race run` needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub target: String,
    /// Columns dropped before modelling (identifiers, free-text notes, ...).
    pub exclude: Vec<String>,
    /// Force the task instead of inferring it from the target.
    pub task: Option<TaskKind>,
    pub positive_class: Option<String>,
    /// Defaults to RMSE for regression and ROC AUC for classification.
    pub metric: Option<MetricKind>,
    pub seed: u64,
    /// Worker threads for the race (0 = one per core).
    pub threads: usize,
    pub resample: ResampleConfig,
    pub race: RaceSettings,
    /// Optional per-algorithm cap on the candidate grid.
    pub grid: Option<GridSample>,
    /// Candidate grids; the built-in set is used when empty.
    pub algorithms: Vec<AlgorithmGrid>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            exclude: Vec::new(),
            task: None,
            positive_class: None,
            metric: None,
            seed: 42,
            threads: 0,
            resample: ResampleConfig::default(),
            race: RaceSettings::default(),
            grid: None,
            algorithms: Vec::new(),
        }
    }
}

impl RaceConfig {
    /// Configured grids, or the built-in set.
    pub fn algorithm_grids(&self) -> Vec<AlgorithmGrid> {
        if self.algorithms.is_empty() {
            AlgorithmGrid::defaults()
        } else {
            self.algorithms.clone()
        }
    }

    /// Metric for the given task, checking a configured one fits it.
    pub fn resolve_metric(&self, task: TaskKind) -> Result<MetricKind, RaceError> {
        match self.metric {
            None => Ok(MetricKind::default_for(task)),
            Some(metric) if metric.task() == task => Ok(metric),
            Some(metric) => Err(RaceError::invalid(format!(
                "Metric {} does not apply to a {task:?} target.",
                metric.display_name()
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), RaceError> {
        if self.target.trim().is_empty() {
            return Err(RaceError::invalid(
                "No target column: set `target` in the config or pass --target.",
            ));
        }
        if self.resample.partitions < 2 {
            return Err(RaceError::invalid(format!(
                "partitions must be >= 2, got {}",
                self.resample.partitions
            )));
        }
        if self.resample.repeats == 0 {
            return Err(RaceError::invalid("repeats must be >= 1"));
        }
        self.race.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: RaceConfig = toml::from_str("target = \"wage\"").unwrap();
        assert_eq!(config.resample, ResampleConfig::default());
        assert_eq!(config.race.burn_in, 3);
        assert_eq!(config.race.alpha, 0.05);
        assert!(config.validate().is_ok());
        assert_eq!(config.algorithm_grids().len(), 4);
    }

    #[test]
    fn validation_catches_bad_race_settings() {
        let mut config = RaceConfig {
            target: "wage".to_string(),
            ..RaceConfig::default()
        };
        config.race.alpha = 1.5;
        assert!(config.validate().is_err());

        config.race.alpha = 0.05;
        config.race.burn_in = 1;
        assert!(config.validate().is_err());

        config.race.burn_in = 3;
        config.resample.partitions = 1;
        assert!(matches!(
            config.validate(),
            Err(RaceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn metric_must_match_task() {
        let config = RaceConfig {
            metric: Some(MetricKind::RocAuc),
            ..RaceConfig::default()
        };
        assert!(config.resolve_metric(TaskKind::Regression).is_err());
        assert_eq!(
            config.resolve_metric(TaskKind::Classification).unwrap(),
            MetricKind::RocAuc
        );
    }

    #[test]
    fn parses_full_config() {
        let text = r#"
            target = "promoted"
            exclude = ["employee_id"]
            metric = "log-loss"
            seed = 7

            [resample]
            mode = "kfold"
            partitions = 5
            repeats = 2

            [race]
            burn_in = 4
            alpha = 0.1
            test = "paired-t"

            [grid]
            size = 4
            method = "regular"

            [[algorithms]]
            kind = "tree"
            max_depth = [2, 4]
        "#;
        let config: RaceConfig = toml::from_str(text).unwrap();
        assert_eq!(config.resample.mode, SamplingMode::Kfold);
        assert_eq!(config.resample.repeats, 2);
        assert!(config.resample.stratify);
        assert_eq!(config.race.test, EliminationTest::PairedT);
        assert_eq!(config.metric, Some(MetricKind::LogLoss));
        assert_eq!(config.grid.map(|g| g.size), Some(4));
        assert_eq!(config.algorithms.len(), 1);
    }
}
