//! Ranked view of the candidates still in the race.

use std::cmp::Ordering;
use std::time::Duration;

use serde::Serialize;

use crate::domain::{Candidate, Direction, Trial};
use crate::math::stats::{mean, std_error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub candidate: Candidate,
    /// Mean metric over scored trials (`NaN` if none). Failed trials are
    /// not averaged in; they rank through `failed` instead.
    pub mean: f64,
    pub std_err: f64,
    pub scored: usize,
    pub failed: usize,
    /// Summed wall-clock time of this candidate's evaluations.
    pub total_cost: Duration,
}

impl LeaderboardEntry {
    /// Summarise `trials`, which must all belong to `candidate`.
    pub fn from_trials<'a>(
        candidate: &Candidate,
        trials: impl IntoIterator<Item = &'a Trial>,
    ) -> Self {
        let mut values = Vec::new();
        let mut failed = 0;
        let mut total_cost = Duration::ZERO;
        for trial in trials {
            total_cost += trial.elapsed;
            match trial.metric() {
                Some(v) => values.push(v),
                None => failed += 1,
            }
        }
        Self {
            candidate: candidate.clone(),
            mean: mean(&values),
            std_err: std_error(&values),
            scored: values.len(),
            failed,
            total_cost,
        }
    }
}

/// Surviving candidates, best first.
///
/// Order: fewer failed trials, then mean metric in the metric's preferred
/// direction, then lower total cost, then lower candidate id. A failed trial
/// is a worst-case score, so it outweighs any difference in the mean. Entries
/// without a score sort last.
///
/// Cost is measured wall-clock time, compared in whole milliseconds. Two
/// candidates tied on failures and mean can still swap places between reruns
/// when their costs straddle a millisecond; the trial metrics themselves are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    direction: Direction,
    entries: Vec<LeaderboardEntry>,
    /// Size of the original candidate set.
    pub candidates: usize,
    pub eliminated_by_failure: usize,
    pub eliminated_by_statistics: usize,
}

impl Leaderboard {
    pub fn new(direction: Direction, mut entries: Vec<LeaderboardEntry>, candidates: usize) -> Self {
        entries.sort_by(|a, b| rank(direction, a, b));
        Self {
            direction,
            entries,
            candidates,
            eliminated_by_failure: 0,
            eliminated_by_statistics: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn rank(direction: Direction, a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    let key = |e: &LeaderboardEntry| {
        if e.mean.is_finite() {
            direction.orient(e.mean)
        } else {
            f64::INFINITY
        }
    };
    a.failed
        .cmp(&b.failed)
        .then(key(a).total_cmp(&key(b)))
        .then(a.total_cost.as_millis().cmp(&b.total_cost.as_millis()))
        .then(a.candidate.id.cmp(&b.candidate.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateId, Params};

    fn entry(id: usize, mean: f64, cost_ms: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            candidate: Candidate {
                id: CandidateId(id),
                params: Params::Linear { penalty: 1.0 },
            },
            mean,
            std_err: 0.0,
            scored: 3,
            failed: 0,
            total_cost: Duration::from_millis(cost_ms),
        }
    }

    fn ids(board: &Leaderboard) -> Vec<usize> {
        board.entries().iter().map(|e| e.candidate.id.0).collect()
    }

    #[test]
    fn orders_by_direction_then_cost_then_id() {
        let entries = vec![
            entry(0, 2.0, 10),
            entry(1, 1.0, 30),
            entry(2, 1.0, 20),
            entry(3, f64::NAN, 1),
            entry(4, 1.0, 20),
        ];
        let board = Leaderboard::new(Direction::LowerIsBetter, entries.clone(), 5);
        assert_eq!(ids(&board), vec![2, 4, 1, 0, 3]);

        let board = Leaderboard::new(Direction::HigherIsBetter, entries, 5);
        assert_eq!(ids(&board), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn failures_outrank_a_better_mean() {
        let mut flaky = entry(0, 0.5, 5);
        flaky.scored = 1;
        flaky.failed = 2;
        let steady = entry(1, 1.0, 15);
        let board = Leaderboard::new(Direction::LowerIsBetter, vec![flaky, steady], 2);
        assert_eq!(ids(&board), vec![1, 0]);
    }

    #[test]
    fn sub_millisecond_cost_differences_fall_through_to_the_id() {
        let mut a = entry(3, 1.0, 0);
        a.total_cost = Duration::from_micros(12_400);
        let mut b = entry(1, 1.0, 0);
        b.total_cost = Duration::from_micros(12_900);
        let board = Leaderboard::new(Direction::LowerIsBetter, vec![a, b], 4);
        assert_eq!(ids(&board), vec![1, 3]);
    }
}
