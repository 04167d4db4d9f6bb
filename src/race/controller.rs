//! The race: rounds over partitions with early statistical elimination.
//!
//! One round evaluates every survivor on the same partition, so results stay
//! paired across candidates. Rounds are separated by a join: elimination only
//! looks at complete rounds and the survivor list is only changed between
//! rounds.
//!
//! After `burn_in` completed rounds, each round ends with an elimination step:
//!
//! 1. survivors that have never produced a score are eliminated by failure;
//! 2. the rest are compared one-sided against the best-mean survivor and the
//!    ones significantly worse at `alpha` are eliminated.
//!
//! For the test, metrics are oriented so that smaller is better, failed
//! trials are imputed with the worst score of their round, and rounds where
//! no contender scored are left out.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::{
    Candidate, CandidateId, Direction, Elimination, EliminationReason, EliminationTest, Partition,
    PartitionId, RaceSettings, SkippedPartition, Trial, TrialOutcome,
};
use crate::error::{FitScope, RaceError};
use crate::math::stats::{mean, std_error, student_t_upper_tail};
use crate::race::{Evaluate, Leaderboard, LeaderboardEntry, WorkerPool};

/// Standard errors below this are treated as zero.
const MIN_STD_ERR: f64 = 1e-12;

/// What happened in one completed round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    /// 1-based; skipped partitions do not count.
    pub round: usize,
    pub partition: PartitionId,
    pub label: String,
    pub evaluated: usize,
    pub failed: usize,
    pub eliminated: Vec<CandidateId>,
    pub survivors: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RaceOutcome {
    /// Every trial, in round order then survivor order.
    pub trials: Vec<Trial>,
    pub rounds: Vec<RoundSummary>,
    pub eliminations: Vec<Elimination>,
    pub skipped: Vec<SkippedPartition>,
    pub leaderboard: Leaderboard,
}

impl RaceOutcome {
    pub fn trials_for(&self, candidate: CandidateId) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(move |t| t.candidate == candidate)
    }

    /// Evaluations a full grid search over the same rounds would have run.
    pub fn full_grid_evaluations(&self) -> usize {
        self.leaderboard.candidates * self.rounds.len()
    }
}

/// Race `candidates` over `partitions` in order.
///
/// Never fails: learner failures and unusable partitions are recorded in the
/// outcome. An empty leaderboard means nothing survived.
pub fn run_race<E: Evaluate + ?Sized>(
    candidates: &[Candidate],
    partitions: &[Partition],
    evaluator: &E,
    settings: &RaceSettings,
    direction: Direction,
    pool: &WorkerPool,
) -> RaceOutcome {
    // Positions into `candidates`, in candidate order.
    let mut survivors: Vec<usize> = (0..candidates.len()).collect();
    // Oriented score per completed round (`None` = failed). Survivors have one
    // entry for every completed round.
    let mut history: Vec<Vec<Option<f64>>> = vec![Vec::new(); candidates.len()];

    let mut trials = Vec::new();
    let mut rounds = Vec::new();
    let mut eliminations = Vec::new();
    let mut skipped = Vec::new();
    let mut round = 0;

    tracing::info!(
        candidates = candidates.len(),
        partitions = partitions.len(),
        burn_in = settings.burn_in,
        alpha = settings.alpha,
        test = ?settings.test,
        threads = pool.threads(),
        "race started"
    );

    for partition in partitions {
        if let Err(err) = evaluator.check_partition(partition) {
            tracing::warn!("{err}; skipped for every candidate");
            let cause = match err {
                RaceError::PartitionError { cause, .. } => cause,
                other => other.to_string(),
            };
            skipped.push(SkippedPartition {
                partition: partition.id,
                cause,
            });
            continue;
        }

        round += 1;
        let started = Instant::now();
        tracing::debug!(round, partition = %partition.id, survivors = survivors.len(), "round started");

        let round_trials = pool.map(&survivors, |&c| evaluator.evaluate(&candidates[c], partition));

        let mut failed = 0;
        for (&c, trial) in survivors.iter().zip(&round_trials) {
            if let TrialOutcome::Failed(cause) = &trial.outcome {
                failed += 1;
                let err = RaceError::FitError {
                    candidate: trial.candidate,
                    scope: FitScope::Partition(partition.id),
                    cause: cause.clone(),
                };
                tracing::warn!("{err}");
            }
            let value = trial
                .metric()
                .filter(|v| v.is_finite())
                .map(|v| direction.orient(v));
            history[c].push(value);
        }
        let evaluated = round_trials.len();
        trials.extend(round_trials);

        let mut eliminated = Vec::new();
        if round >= settings.burn_in {
            for (c, reason) in elimination_step(&survivors, &history, settings) {
                let id = candidates[c].id;
                log_elimination(id, round, &reason);
                eliminations.push(Elimination {
                    candidate: id,
                    round,
                    reason,
                });
                eliminated.push(id);
                survivors.retain(|&s| s != c);
            }
        }

        rounds.push(RoundSummary {
            round,
            partition: partition.id,
            label: partition.label.clone(),
            evaluated,
            failed,
            eliminated,
            survivors: survivors.len(),
            elapsed: started.elapsed(),
        });

        let settled = match survivors.as_slice() {
            [] => true,
            [only] => history[*only].iter().any(Option::is_some),
            _ => false,
        };
        if settled {
            tracing::debug!(round, "race settled early");
            break;
        }
    }

    // Whatever never scored cannot be ranked.
    let (unscored, scored): (Vec<usize>, Vec<usize>) = survivors
        .into_iter()
        .partition(|&c| history[c].iter().all(Option::is_none));
    for c in unscored {
        let reason = EliminationReason::Failure {
            failures: history[c].len(),
        };
        log_elimination(candidates[c].id, round, &reason);
        eliminations.push(Elimination {
            candidate: candidates[c].id,
            round,
            reason,
        });
    }

    let entries = scored
        .iter()
        .map(|&c| {
            let id = candidates[c].id;
            LeaderboardEntry::from_trials(&candidates[c], trials.iter().filter(|t| t.candidate == id))
        })
        .collect();
    let mut leaderboard = Leaderboard::new(direction, entries, candidates.len());
    leaderboard.eliminated_by_failure = eliminations
        .iter()
        .filter(|e| matches!(e.reason, EliminationReason::Failure { .. }))
        .count();
    leaderboard.eliminated_by_statistics = eliminations.len() - leaderboard.eliminated_by_failure;

    tracing::info!(
        rounds = round,
        skipped = skipped.len(),
        evaluations = trials.len(),
        survivors = leaderboard.len(),
        "race finished"
    );

    RaceOutcome {
        trials,
        rounds,
        eliminations,
        skipped,
        leaderboard,
    }
}

fn log_elimination(id: CandidateId, round: usize, reason: &EliminationReason) {
    match reason {
        EliminationReason::Statistical { p_value, gap } => {
            tracing::info!(candidate = %id, round, p_value, gap, "eliminated by the elimination test");
        }
        EliminationReason::Failure { failures } => {
            tracing::info!(candidate = %id, round, failures, "eliminated: no successful fit");
        }
    }
}

/// Candidates (as positions) to remove after this round, with reasons.
fn elimination_step(
    survivors: &[usize],
    history: &[Vec<Option<f64>>],
    settings: &RaceSettings,
) -> Vec<(usize, EliminationReason)> {
    let mut out = Vec::new();
    let mut contenders = Vec::new();
    for &c in survivors {
        if history[c].iter().all(Option::is_none) {
            out.push((
                c,
                EliminationReason::Failure {
                    failures: history[c].len(),
                },
            ));
        } else {
            contenders.push(c);
        }
    }
    if contenders.len() >= 2 {
        out.extend(test_against_best(&contenders, history, settings));
    }
    out
}

fn test_against_best(
    contenders: &[usize],
    history: &[Vec<Option<f64>>],
    settings: &RaceSettings,
) -> Vec<(usize, EliminationReason)> {
    let rounds = history[contenders[0]].len();

    // x[i] = contender i's oriented scores over the usable rounds.
    let mut x: Vec<Vec<f64>> = vec![Vec::with_capacity(rounds); contenders.len()];
    for j in 0..rounds {
        let worst = contenders
            .iter()
            .filter_map(|&c| history[c][j])
            .fold(f64::NEG_INFINITY, f64::max);
        if worst == f64::NEG_INFINITY {
            continue;
        }
        for (row, &c) in x.iter_mut().zip(contenders) {
            row.push(history[c][j].unwrap_or(worst));
        }
    }

    let b = x[0].len();
    if b < 2 {
        return Vec::new();
    }
    let row_means: Vec<f64> = x.iter().map(|row| mean(row)).collect();
    let mut best = 0;
    for (i, m) in row_means.iter().enumerate() {
        if *m < row_means[best] {
            best = i;
        }
    }

    let mut out = Vec::new();
    match settings.test {
        EliminationTest::Anova => {
            let a = x.len();
            let col_means: Vec<f64> = (0..b)
                .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / a as f64)
                .collect();
            let grand = mean(&row_means);
            let sse: f64 = x
                .iter()
                .zip(&row_means)
                .map(|(row, rm)| {
                    row.iter()
                        .zip(&col_means)
                        .map(|(v, cm)| (v - rm - cm + grand).powi(2))
                        .sum::<f64>()
                })
                .sum();
            let df = ((a - 1) * (b - 1)) as f64;
            let se = (2.0 * (sse / df) / b as f64).sqrt();
            for i in (0..a).filter(|&i| i != best) {
                let gap = row_means[i] - row_means[best];
                let p_value = one_sided_p(gap, se, df);
                if p_value < settings.alpha {
                    out.push((contenders[i], EliminationReason::Statistical { p_value, gap }));
                }
            }
        }
        EliminationTest::PairedT => {
            let df = (b - 1) as f64;
            for i in (0..x.len()).filter(|&i| i != best) {
                let d: Vec<f64> = x[i].iter().zip(&x[best]).map(|(v, w)| v - w).collect();
                let gap = mean(&d);
                let p_value = one_sided_p(gap, std_error(&d), df);
                if p_value < settings.alpha {
                    out.push((contenders[i], EliminationReason::Statistical { p_value, gap }));
                }
            }
        }
    }
    out
}

/// `P(T > gap / se)`; a zero standard error makes any positive gap decisive.
fn one_sided_p(gap: f64, se: f64, df: f64) -> f64 {
    if !(se > MIN_STD_ERR) {
        return if gap > MIN_STD_ERR { 0.0 } else { 1.0 };
    }
    student_t_upper_tail(gap / se, df)
}
