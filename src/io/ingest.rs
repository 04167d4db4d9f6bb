//! CSV ingest.
//!
//! Turns a delimited file into a `RawTable` with normalized header names.
//! Typing (numeric / categorical / text) happens later in `Dataset::from_raw`;
//! this layer only deals with the file itself:
//!
//! - **Strict header** (duplicate or empty names are errors, exit code 2)
//! - **Row-level validation**: malformed rows and rows whose target is
//!   missing (or non-numeric for a regression target) are skipped and
//!   reported, never silently dropped

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{RawTable, TaskKind, is_missing, normalize_name};
use crate::error::AppError;

/// A row-level problem found during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based line number in the file (the header is line 1).
    pub line: usize,
    pub message: String,
}

/// What to check per row besides the column count.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Skip rows whose value in this column is missing.
    pub target: Option<String>,
    /// With `Regression`, also skip rows whose target is not a number.
    pub task: Option<TaskKind>,
}

#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: RawTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedTable {
    pub fn rows_used(&self) -> usize {
        self.table.rows.len()
    }
}

/// Read a CSV file with a header row.
pub fn load_csv(path: &Path, options: &IngestOptions) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_csv(file, options)
        .map_err(|e| AppError::new(e.exit_code(), format!("{} ({})", e.message(), path.display())))
}

/// Read CSV text from any reader.
pub fn read_csv<R: std::io::Read>(reader: R, options: &IngestOptions) -> Result<IngestedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let raw_headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let headers = normalize_headers(&raw_headers)?;

    let target_idx = match &options.target {
        Some(target) => {
            let name = normalize_name(target);
            let idx = headers.iter().position(|h| *h == name).ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "Target column `{name}` not found (columns: {}).",
                        headers.join(", ")
                    ),
                )
            })?;
            Some(idx)
        }
        None => None,
    };

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match check_row(&record, headers.len(), target_idx, options.task) {
            Ok(()) => rows.push(record.iter().map(str::to_string).collect()),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if rows.is_empty() {
        return Err(AppError::new(
            2,
            format!("No usable rows in CSV ({rows_read} read, all rejected)."),
        ));
    }
    if !row_errors.is_empty() {
        tracing::warn!(
            skipped = row_errors.len(),
            rows_read,
            "some CSV rows were skipped"
        );
    }

    Ok(IngestedTable {
        table: RawTable { headers, rows },
        row_errors,
        rows_read,
    })
}

fn normalize_headers(headers: &StringRecord) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());
    for (idx, raw) in headers.iter().enumerate() {
        let name = normalize_name(raw);
        if name.is_empty() {
            return Err(AppError::new(
                2,
                format!("CSV header column {} has no usable name.", idx + 1),
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(AppError::new(
                2,
                format!("Duplicate CSV column `{name}` after normalizing header names."),
            ));
        }
        out.push(name);
    }
    Ok(out)
}

fn check_row(
    record: &StringRecord,
    width: usize,
    target_idx: Option<usize>,
    task: Option<TaskKind>,
) -> Result<(), String> {
    if record.len() != width {
        return Err(format!("Expected {width} fields, found {}.", record.len()));
    }
    let Some(idx) = target_idx else {
        return Ok(());
    };
    let value = record.get(idx).unwrap_or("");
    if is_missing(value) {
        return Err("Missing target value.".to_string());
    }
    if task == Some(TaskKind::Regression) && value.parse::<f64>().map_or(true, |v| !v.is_finite()) {
        return Err(format!("Target value `{value}` is not a number."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(target: &str) -> IngestOptions {
        IngestOptions {
            target: Some(target.to_string()),
            task: None,
        }
    }

    #[test]
    fn reads_and_normalizes_headers() {
        let csv = "\u{feff}Employee ID, Job Level ,Wage\ne1,2,41.5\ne2,3,55\n";
        let ingested = read_csv(csv.as_bytes(), &options("wage")).unwrap();
        assert_eq!(ingested.table.headers, vec!["employee_id", "job_level", "wage"]);
        assert_eq!(ingested.rows_used(), 2);
        assert_eq!(ingested.table.rows[1], vec!["e2", "3", "55"]);
        assert!(ingested.row_errors.is_empty());
    }

    #[test]
    fn skips_and_reports_bad_rows() {
        let csv = "x,wage\n1,40\n2,\n3,NA\n4,45,extra\n5,50\n";
        let ingested = read_csv(csv.as_bytes(), &options("wage")).unwrap();
        assert_eq!(ingested.rows_read, 5);
        assert_eq!(ingested.rows_used(), 2);
        let lines: Vec<usize> = ingested.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn regression_targets_must_parse() {
        let csv = "x,wage\n1,40\n2,forty\n";
        let opts = IngestOptions {
            task: Some(TaskKind::Regression),
            ..options("wage")
        };
        let ingested = read_csv(csv.as_bytes(), &opts).unwrap();
        assert_eq!(ingested.rows_used(), 1);
        assert!(ingested.row_errors[0].message.contains("forty"));
    }

    #[test]
    fn header_problems_are_fatal() {
        let err = read_csv("Wage,wage\n1,2\n".as_bytes(), &IngestOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(read_csv("x,y\n1,2\n".as_bytes(), &options("wage")).is_err());
        assert!(read_csv("x,wage\n1,\n".as_bytes(), &options("wage")).is_err());
    }

    #[test]
    fn load_csv_reports_missing_file() {
        let err = load_csv(Path::new("/definitely/not/here.csv"), &IngestOptions::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
