//! Export race results and predictions to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Elimination, EliminationReason, RawTable, Record, Trial, TrialOutcome};
use crate::error::AppError;
use crate::race::{FinalModel, RaceOutcome};

/// Write every trial of a race, one row per (candidate, partition) evaluation.
pub fn write_trials_csv(path: &Path, outcome: &RaceOutcome) -> Result<(), AppError> {
    let mut writer = create(path)?;
    writer
        .write_record([
            "candidate",
            "algorithm",
            "params",
            "partition",
            "status",
            "metric",
            "elapsed_ms",
            "eliminated_round",
            "elimination",
            "note",
        ])
        .map_err(|e| write_error(path, e))?;

    for trial in &outcome.trials {
        let elimination = outcome
            .eliminations
            .iter()
            .find(|e| e.candidate == trial.candidate);
        writer
            .write_record(trial_row(trial, elimination))
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

fn trial_row(trial: &Trial, elimination: Option<&Elimination>) -> Vec<String> {
    let (status, metric, note) = match &trial.outcome {
        TrialOutcome::Scored(v) => ("scored", format!("{v:.10}"), String::new()),
        TrialOutcome::Failed(cause) => ("failed", String::new(), cause.clone()),
    };
    let (round, reason) = match elimination {
        Some(e) => (
            e.round.to_string(),
            match e.reason {
                EliminationReason::Statistical { .. } => "statistical",
                EliminationReason::Failure { .. } => "failure",
            }
            .to_string(),
        ),
        None => (String::new(), String::new()),
    };
    vec![
        trial.candidate.0.to_string(),
        trial.params.algorithm().name().to_string(),
        trial.params.to_string(),
        trial.partition.to_string(),
        status.to_string(),
        metric,
        format!("{:.3}", trial.elapsed.as_secs_f64() * 1000.0),
        round,
        reason,
        note,
    ]
}

/// Write predictions next to the input rows' identifying column (if any).
pub fn write_predictions_csv(
    path: &Path,
    model: &FinalModel,
    records: &[Record],
    ids: Option<(&str, &[String])>,
) -> Result<(), AppError> {
    let writer = create(path)?;
    write_predictions(writer, model, records, ids).map_err(|e| write_error(path, e))
}

/// Same as [`write_predictions_csv`] on any writer (e.g. stdout).
pub fn write_predictions<W: Write>(
    mut writer: csv::Writer<W>,
    model: &FinalModel,
    records: &[Record],
    ids: Option<(&str, &[String])>,
) -> Result<(), csv::Error> {
    let mut header = Vec::new();
    if let Some((name, _)) = ids {
        header.push(name.to_string());
    }
    let target = &model.target.name;
    match model.target.classes {
        Some(_) => {
            header.push(format!("{target}_probability"));
            header.push(format!("{target}_predicted"));
        }
        None => header.push(format!("{target}_predicted")),
    }
    writer.write_record(&header)?;

    for (i, record) in records.iter().enumerate() {
        let prediction = model.predict(record);
        let mut row = Vec::with_capacity(header.len());
        if let Some((_, values)) = ids {
            row.push(values.get(i).cloned().unwrap_or_default());
        }
        row.push(format!("{:.6}", prediction.value));
        if let Some(label) = prediction.label {
            row.push(label);
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a raw table as CSV (header row first).
pub fn write_table_csv(path: &Path, table: &RawTable) -> Result<(), AppError> {
    let mut writer = create(path)?;
    writer
        .write_record(&table.headers)
        .map_err(|e| write_error(path, e))?;
    for row in &table.rows {
        writer.write_record(row).map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

fn create(path: &Path) -> Result<csv::Writer<File>, AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display()))
    })?;
    Ok(csv::Writer::from_writer(file))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(2, format!("Failed to write CSV '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{CandidateId, Params, PartitionId};

    #[test]
    fn trial_rows_carry_outcome_and_elimination() {
        let trial = Trial {
            candidate: CandidateId(2),
            params: Params::Tree {
                max_depth: 3,
                min_leaf: 5,
            },
            partition: PartitionId(4),
            outcome: TrialOutcome::Failed("singular design matrix".to_string()),
            elapsed: Duration::from_millis(12),
        };
        let elimination = Elimination {
            candidate: CandidateId(2),
            round: 5,
            reason: EliminationReason::Failure { failures: 5 },
        };
        let row = trial_row(&trial, Some(&elimination));
        assert_eq!(row[0], "2");
        assert_eq!(row[1], "tree");
        assert_eq!(row[3], "P04");
        assert_eq!(row[4], "failed");
        assert_eq!(row[5], "");
        assert_eq!(row[6], "12.000");
        assert_eq!(row[7], "5");
        assert_eq!(row[8], "failure");
        assert_eq!(row[9], "singular design matrix");
    }

    #[test]
    fn table_csv_quotes_where_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = RawTable {
            headers: vec!["id".to_string(), "notes".to_string()],
            rows: vec![vec!["E00001".to_string(), "remote, part-time".to_string()]],
        };
        write_table_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,notes\nE00001,\"remote, part-time\"\n");
    }
}
