//! Reporting: race tallies and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::EliminationReason;
use crate::race::RaceOutcome;

/// Headline numbers of a finished race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceTally {
    pub by_statistics: usize,
    pub by_failure: usize,
    /// Evaluator calls actually made.
    pub trials: usize,
    /// Calls a full grid search over the same rounds would have made.
    pub full_grid: usize,
}

impl RaceTally {
    pub fn from_outcome(outcome: &RaceOutcome) -> Self {
        let by_failure = outcome
            .eliminations
            .iter()
            .filter(|e| matches!(e.reason, EliminationReason::Failure { .. }))
            .count();
        Self {
            by_statistics: outcome.eliminations.len() - by_failure,
            by_failure,
            trials: outcome.trials.len(),
            full_grid: outcome.full_grid_evaluations(),
        }
    }

    /// Share of full-grid evaluations the race skipped.
    pub fn saved_fraction(&self) -> f64 {
        if self.full_grid == 0 {
            return 0.0;
        }
        1.0 - self.trials as f64 / self.full_grid as f64
    }
}
