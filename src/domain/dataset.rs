//! Tabular dataset model.
//!
//! A `Dataset` is built once from a raw string table (CSV rows or a synthetic
//! generator) and then only borrowed: partitions hold row indices into it and
//! learners read from it, nobody mutates it.

use std::collections::BTreeSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RaceError;

/// Categorical columns with more distinct values than this (and more than
/// half the rows) are treated as free text.
const MAX_CATEGORY_LEVELS: usize = 20;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Category(String),
    Text(String),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            _ => None,
        }
    }
}

/// How a feature column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Categorical,
    /// Free text. Kept in records but ignored by the feature encoder.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureColumn {
    /// Parse a raw cell according to this column's kind.
    pub fn parse(&self, raw: &str) -> Value {
        let raw = raw.trim();
        if is_missing(raw) {
            return Value::Missing;
        }
        match self.kind {
            FeatureKind::Numeric => match parse_number(raw) {
                Some(v) => Value::Number(v),
                None => Value::Missing,
            },
            FeatureKind::Categorical => Value::Category(raw.to_string()),
            FeatureKind::Text => Value::Text(raw.to_string()),
        }
    }
}

/// One row of feature values, aligned with the dataset schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn get(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&Value::Missing)
    }
}

/// Learning task implied by the target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Regression,
    Classification,
}

/// The two class labels of a binary target. `positive` is encoded as `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    pub negative: String,
    pub positive: String,
}

impl ClassLabels {
    pub fn label(&self, is_positive: bool) -> &str {
        if is_positive {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// Description of the target column (shared with saved models).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub task: TaskKind,
    pub classes: Option<ClassLabels>,
}

/// A header plus rows of raw cells, before typing.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Options that decide how a raw table becomes a dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    pub target: String,
    pub exclude: Vec<String>,
    pub task: Option<TaskKind>,
    pub positive_class: Option<String>,
}

/// Summary numbers for terminal reports.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub rows: usize,
    pub numeric: usize,
    pub categorical: usize,
    pub text: usize,
    pub target_mean: f64,
    pub target_sd: f64,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Vec<FeatureColumn>,
    records: Vec<Record>,
    target: TargetSpec,
    targets: Vec<f64>,
}

impl Dataset {
    /// Type a raw table: pick the target, infer feature kinds and the task.
    pub fn from_raw(table: &RawTable, options: &DatasetOptions) -> Result<Self, RaceError> {
        let target_name = normalize_name(&options.target);
        if target_name.is_empty() {
            return Err(RaceError::invalid("No target column configured."));
        }
        let headers: Vec<String> = table.headers.iter().map(|h| normalize_name(h)).collect();
        let Some(target_idx) = headers.iter().position(|h| *h == target_name) else {
            return Err(RaceError::invalid(format!(
                "Target column `{target_name}` not found (columns: {}).",
                headers.join(", ")
            )));
        };
        if table.rows.is_empty() {
            return Err(RaceError::invalid("Dataset has no rows."));
        }

        let exclude: BTreeSet<String> = options.exclude.iter().map(|e| normalize_name(e)).collect();
        for name in &exclude {
            if !headers.contains(name) {
                tracing::warn!("excluded column `{name}` is not in the dataset");
            }
        }

        let cell = |row: &[String], idx: usize| -> String {
            row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
        };

        let raw_targets: Vec<String> = table.rows.iter().map(|r| cell(r, target_idx)).collect();
        if let Some(pos) = raw_targets.iter().position(|t| is_missing(t)) {
            return Err(RaceError::invalid(format!(
                "Row {} has a missing target value.",
                pos + 1
            )));
        }
        let (target, targets) = type_target(&target_name, &raw_targets, options)?;

        let n = table.rows.len();
        let mut feature_idx = Vec::new();
        let mut schema = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            if idx == target_idx || exclude.contains(name) {
                continue;
            }
            let cells: Vec<String> = table.rows.iter().map(|r| cell(r, idx)).collect();
            schema.push(FeatureColumn {
                name: name.clone(),
                kind: infer_kind(&cells, n),
            });
            feature_idx.push(idx);
        }

        let records = table
            .rows
            .iter()
            .map(|row| Record {
                values: schema
                    .iter()
                    .zip(&feature_idx)
                    .map(|(col, &idx)| col.parse(&cell(row, idx)))
                    .collect(),
            })
            .collect();

        Ok(Self {
            schema,
            records,
            target,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn schema(&self) -> &[FeatureColumn] {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, row: usize) -> &Record {
        &self.records[row]
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn task(&self) -> TaskKind {
        self.target.task
    }

    /// Numeric target per row (`0.0`/`1.0` for classification).
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Look up a feature value by column name.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.schema.iter().position(|c| c.name == name)?;
        self.records.get(row).map(|r| r.get(col))
    }

    pub fn stats(&self) -> DatasetStats {
        let count = |kind: FeatureKind| self.schema.iter().filter(|c| c.kind == kind).count();
        let n = self.targets.len().max(1) as f64;
        let mean = self.targets.iter().sum::<f64>() / n;
        let var = self.targets.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
        DatasetStats {
            rows: self.len(),
            numeric: count(FeatureKind::Numeric),
            categorical: count(FeatureKind::Categorical),
            text: count(FeatureKind::Text),
            target_mean: mean,
            target_sd: var.sqrt(),
        }
    }
}

fn type_target(
    name: &str,
    raw: &[String],
    options: &DatasetOptions,
) -> Result<(TargetSpec, Vec<f64>), RaceError> {
    let numeric: Option<Vec<f64>> = raw.iter().map(|s| parse_number(s)).collect();
    let distinct: BTreeSet<&str> = raw.iter().map(String::as_str).collect();

    let task = match options.task {
        Some(task) => task,
        None => match (&numeric, distinct.len()) {
            (_, 2) => TaskKind::Classification,
            (Some(_), d) if d > 2 => TaskKind::Regression,
            (None, d) if d > 2 => {
                return Err(RaceError::invalid(format!(
                    "Target `{name}` is non-numeric with {d} classes; only binary classification is supported."
                )));
            }
            _ => {
                return Err(RaceError::invalid(format!(
                    "Target `{name}` has a single distinct value."
                )));
            }
        },
    };

    match task {
        TaskKind::Regression => {
            let Some(values) = numeric else {
                return Err(RaceError::invalid(format!(
                    "Regression target `{name}` contains non-numeric values."
                )));
            };
            Ok((
                TargetSpec {
                    name: name.to_string(),
                    task,
                    classes: None,
                },
                values,
            ))
        }
        TaskKind::Classification => {
            if distinct.len() != 2 {
                return Err(RaceError::invalid(format!(
                    "Classification target `{name}` must have exactly 2 classes, found {}.",
                    distinct.len()
                )));
            }
            let labels: Vec<&str> = distinct.into_iter().collect();
            let positive = match &options.positive_class {
                Some(p) => {
                    let p = p.trim();
                    if !labels.contains(&p) {
                        return Err(RaceError::invalid(format!(
                            "Positive class `{p}` is not a value of `{name}` ({}).",
                            labels.join(", ")
                        )));
                    }
                    p.to_string()
                }
                None => labels[1].to_string(),
            };
            let negative = labels
                .iter()
                .find(|l| **l != positive)
                .map(|l| l.to_string())
                .unwrap_or_default();
            let values = raw
                .iter()
                .map(|s| if *s == positive { 1.0 } else { 0.0 })
                .collect();
            Ok((
                TargetSpec {
                    name: name.to_string(),
                    task,
                    classes: Some(ClassLabels { negative, positive }),
                },
                values,
            ))
        }
    }
}

fn infer_kind(cells: &[String], n_rows: usize) -> FeatureKind {
    let present: Vec<&str> = cells
        .iter()
        .map(String::as_str)
        .filter(|s| !is_missing(s))
        .collect();
    if present.iter().all(|s| parse_number(s).is_some()) {
        return FeatureKind::Numeric;
    }
    let levels: BTreeSet<&str> = present.iter().copied().collect();
    if levels.len() <= MAX_CATEGORY_LEVELS.max(n_rows / 2) {
        FeatureKind::Categorical
    } else {
        FeatureKind::Text
    }
}

/// Canonical column name: trimmed, BOM stripped, lowercase, snake_case.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

pub fn is_missing(raw: &str) -> bool {
    matches!(
        raw.trim(),
        "" | "NA" | "N/A" | "na" | "n/a" | "null" | "NULL" | "NaN" | "nan"
    )
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn options(target: &str) -> DatasetOptions {
        DatasetOptions {
            target: target.to_string(),
            ..DatasetOptions::default()
        }
    }

    #[test]
    fn normalizes_header_names() {
        assert_eq!(normalize_name("\u{feff} Job Level "), "job_level");
        assert_eq!(normalize_name("Tenure (Years)"), "tenure_years");
        assert_eq!(normalize_name("wage"), "wage");
    }

    #[test]
    fn infers_regression_and_feature_kinds() {
        let t = table(
            &["Dept", "Tenure", "Wage"],
            &[
                &["sales", "1.5", "40"],
                &["hr", "NA", "42"],
                &["sales", "3", "55"],
                &["it", "7", "61"],
            ],
        );
        let ds = Dataset::from_raw(&t, &options("wage")).unwrap();
        assert_eq!(ds.task(), TaskKind::Regression);
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.schema()[0].kind, FeatureKind::Categorical);
        assert_eq!(ds.schema()[1].kind, FeatureKind::Numeric);
        assert_eq!(ds.value(1, "tenure"), Some(&Value::Missing));
        assert_eq!(ds.targets(), &[40.0, 42.0, 55.0, 61.0]);
    }

    #[test]
    fn binary_target_uses_last_label_as_positive() {
        let t = table(
            &["score", "promoted"],
            &[&["1", "no"], &["2", "yes"], &["3", "no"]],
        );
        let ds = Dataset::from_raw(&t, &options("promoted")).unwrap();
        assert_eq!(ds.task(), TaskKind::Classification);
        let classes = ds.target().classes.clone().unwrap();
        assert_eq!(classes.positive, "yes");
        assert_eq!(ds.targets(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn explicit_positive_class_must_exist() {
        let t = table(&["x", "y"], &[&["1", "a"], &["2", "b"]]);
        let mut opts = options("y");
        opts.positive_class = Some("c".to_string());
        assert!(matches!(
            Dataset::from_raw(&t, &opts),
            Err(RaceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn excluded_columns_are_dropped() {
        let t = table(
            &["employee_id", "x", "y"],
            &[&["e1", "1", "1.0"], &["e2", "2", "2.0"], &["e3", "3", "3.5"]],
        );
        let mut opts = options("y");
        opts.exclude = vec!["Employee ID".to_string()];
        let ds = Dataset::from_raw(&t, &opts).unwrap();
        assert_eq!(ds.schema().len(), 1);
        assert_eq!(ds.schema()[0].name, "x");
    }

    #[test]
    fn missing_target_column_is_rejected() {
        let t = table(&["x"], &[&["1"]]);
        assert!(Dataset::from_raw(&t, &options("wage")).is_err());
    }

    #[test]
    fn constant_target_is_rejected() {
        let t = table(&["x", "y"], &[&["1", "5"], &["2", "5"]]);
        assert!(Dataset::from_raw(&t, &options("y")).is_err());
    }
}
