//! Formatted terminal output for races.
//!
//! Formatting lives in one place so the race code stays free of
//! presentation concerns and output changes stay localized.

use crate::domain::{Candidate, Dataset, EliminationReason, MetricKind, TaskKind};
use crate::io::IngestedTable;
use crate::race::{FinalModel, Leaderboard, RaceOutcome};
use crate::report::RaceTally;

/// Dataset section: rows read/used, feature kinds, target.
pub fn format_dataset_summary(ingest: &IngestedTable, dataset: &Dataset, metric: MetricKind) -> String {
    let stats = dataset.stats();
    let target = dataset.target();
    let mut out = String::new();

    out.push_str("=== race - model selection by racing ===\n");
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used(),
        ingest.row_errors.len()
    ));
    for err in ingest.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", err.line, err.message));
    }
    if ingest.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more\n", ingest.row_errors.len() - 5));
    }
    out.push_str(&format!(
        "Features: numeric={} categorical={} text={} (text is ignored)\n",
        stats.numeric, stats.categorical, stats.text
    ));
    match (target.task, &target.classes) {
        (TaskKind::Classification, Some(classes)) => {
            let positives = dataset.targets().iter().filter(|y| **y >= 0.5).count();
            out.push_str(&format!(
                "Target: {} (classification, positive=`{}` {}/{})\n",
                target.name,
                classes.positive,
                positives,
                dataset.len()
            ));
        }
        _ => out.push_str(&format!(
            "Target: {} (regression, mean={:.4} sd={:.4})\n",
            target.name, stats.target_mean, stats.target_sd
        )),
    }
    out.push_str(&format!("Metric: {}\n", metric.display_name()));
    out
}

/// Round table plus elimination and skipped-partition notes.
pub fn format_race_summary(outcome: &RaceOutcome) -> String {
    let tally = RaceTally::from_outcome(outcome);
    let mut out = String::new();

    out.push_str("\nRounds:\n");
    out.push_str(
        format!(
            "{:>5} {:<18} {:>9} {:>6} {:>10} {:>9} {:>10}\n",
            "round", "partition", "evaluated", "failed", "eliminated", "survivors", "elapsed"
        )
        .trim_end(),
    );
    out.push('\n');
    for r in &outcome.rounds {
        out.push_str(
            format!(
                "{:>5} {:<18} {:>9} {:>6} {:>10} {:>9} {:>9.2}s\n",
                r.round,
                truncate(&r.label, 18),
                r.evaluated,
                r.failed,
                r.eliminated.len(),
                r.survivors,
                r.elapsed.as_secs_f64()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    for s in &outcome.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", s.partition, s.cause));
    }

    out.push_str(&format!(
        "\nEliminated: {} by test, {} by failure | trials {} of {} for a full grid ({:.0}% saved)\n",
        tally.by_statistics,
        tally.by_failure,
        tally.trials,
        tally.full_grid,
        tally.saved_fraction() * 100.0
    ));
    for e in &outcome.eliminations {
        let detail = match &e.reason {
            EliminationReason::Statistical { p_value, gap } => {
                format!("p={p_value:.4} gap={gap:.4}")
            }
            EliminationReason::Failure { failures } => format!("{failures} failed trial(s)"),
        };
        out.push_str(&format!("  {} after round {}: {detail}\n", e.candidate, e.round));
    }
    out
}

/// Top-`top` survivors.
pub fn format_leaderboard(board: &Leaderboard, metric: MetricKind, top: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\nLeaderboard ({} of {} candidates survived):\n",
        board.len(),
        board.candidates
    ));
    out.push_str(
        format!(
            "{:>4} {:>5} {:<52} {:>12} {:>10} {:>6} {:>6}\n",
            "rank",
            "id",
            "params",
            metric.display_name(),
            "std_err",
            "scored",
            "failed"
        )
        .trim_end(),
    );
    out.push('\n');
    for (rank, e) in board.entries().iter().take(top).enumerate() {
        out.push_str(
            format!(
                "{:>4} {:>5} {:<52} {:>12.5} {:>10.5} {:>6} {:>6}\n",
                rank + 1,
                e.candidate.id.to_string(),
                truncate(&e.candidate.params.to_string(), 52),
                e.mean,
                e.std_err,
                e.scored,
                e.failed
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// The refitted winner.
pub fn format_winner(model: &FinalModel) -> String {
    let mut out = String::new();
    out.push_str("\nSelected model:\n");
    out.push_str(&format!(
        "- {} {}\n",
        model.candidate.id, model.candidate.params
    ));
    out.push_str(&format!(
        "- {} = {:.5} (± {:.5}, {} partitions)\n",
        model.race.metric.display_name(),
        model.race.mean,
        model.race.std_err,
        model.race.scored
    ));
    out.push_str(&format!(
        "- refitted on {} rows, {} encoded features\n",
        model.training_rows,
        model.feature_names().len()
    ));
    out
}

/// The candidate set, one line per candidate (`race grid`).
pub fn format_candidates(candidates: &[Candidate]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} candidates:\n", candidates.len()));
    for c in candidates {
        out.push_str(&format!("{:>5} {}\n", c.id.to_string(), c.params));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{
        CandidateId, Direction, Elimination, Params, PartitionId, SkippedPartition,
    };
    use crate::race::{LeaderboardEntry, RoundSummary};

    fn candidate(id: usize, penalty: f64) -> Candidate {
        Candidate {
            id: CandidateId(id),
            params: Params::Linear { penalty },
        }
    }

    fn outcome() -> RaceOutcome {
        let entry = LeaderboardEntry {
            candidate: candidate(0, 0.1),
            mean: 0.25,
            std_err: 0.01,
            scored: 3,
            failed: 0,
            total_cost: Duration::from_millis(30),
        };
        let mut leaderboard = Leaderboard::new(Direction::LowerIsBetter, vec![entry], 3);
        leaderboard.eliminated_by_failure = 1;
        leaderboard.eliminated_by_statistics = 1;
        RaceOutcome {
            trials: Vec::new(),
            rounds: (1..=3)
                .map(|round| RoundSummary {
                    round,
                    partition: PartitionId(round),
                    label: format!("Fold{round:02}"),
                    evaluated: 3,
                    failed: 0,
                    eliminated: Vec::new(),
                    survivors: 3,
                    elapsed: Duration::from_millis(10),
                })
                .collect(),
            eliminations: vec![
                Elimination {
                    candidate: CandidateId(1),
                    round: 3,
                    reason: EliminationReason::Statistical {
                        p_value: 0.01,
                        gap: 0.4,
                    },
                },
                Elimination {
                    candidate: CandidateId(2),
                    round: 3,
                    reason: EliminationReason::Failure { failures: 3 },
                },
            ],
            skipped: vec![SkippedPartition {
                partition: PartitionId(0),
                cause: "training set has a single class".to_string(),
            }],
            leaderboard,
        }
    }

    #[test]
    fn race_summary_lists_eliminations_and_skips() {
        let text = format_race_summary(&outcome());
        assert!(text.contains("1 by test, 1 by failure"));
        assert!(text.contains("#1 after round 3: p=0.0100"));
        assert!(text.contains("#2 after round 3: 3 failed trial(s)"));
        assert!(text.contains("(skipped P00) training set has a single class"));
        assert!(text.contains("Fold03"));
    }

    #[test]
    fn leaderboard_respects_top() {
        let board = outcome().leaderboard;
        let text = format_leaderboard(&board, MetricKind::Rmse, 0);
        assert!(text.contains("1 of 3 candidates survived"));
        assert!(!text.contains("linear("));
        let text = format_leaderboard(&board, MetricKind::Rmse, 5);
        assert!(text.contains("linear(penalty="));
        assert!(text.contains("0.25000"));
    }

    #[test]
    fn candidates_are_listed_in_order() {
        let text = format_candidates(&[candidate(0, 1.0), candidate(1, 10.0)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2 candidates:");
        assert!(lines[1].trim_start().starts_with("#0"));
        assert!(lines[2].trim_start().starts_with("#1"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
