//! Feature encoding: records → numeric rows.
//!
//! The encoder is fitted on a training subset only, so validation rows never
//! leak into centering/scaling or the category levels.
//!
//! - numeric: centered and scaled by the training mean / standard deviation;
//!   missing values become the training mean (0 after centering)
//! - categorical: reference coding, one indicator per level except the
//!   first (sorted) training level; unseen levels encode as all zeros
//! - text: ignored

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureColumn, FeatureKind, Record, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EncodedColumn {
    Numeric {
        source: usize,
        name: String,
        mean: f64,
        scale: f64,
    },
    Indicator {
        source: usize,
        name: String,
        level: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: Vec<EncodedColumn>,
}

impl FeatureEncoder {
    /// Learn encoding parameters from `rows` of `records`.
    pub fn fit(schema: &[FeatureColumn], records: &[Record], rows: &[usize]) -> Self {
        let mut columns = Vec::new();
        for (source, col) in schema.iter().enumerate() {
            match col.kind {
                FeatureKind::Numeric => {
                    let values: Vec<f64> = rows
                        .iter()
                        .filter_map(|&r| records[r].get(source).as_number())
                        .collect();
                    let (mean, scale) = if values.is_empty() {
                        (0.0, 1.0)
                    } else {
                        let n = values.len() as f64;
                        let mean = values.iter().sum::<f64>() / n;
                        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                        let sd = var.sqrt();
                        (mean, if sd > 1e-12 { sd } else { 1.0 })
                    };
                    columns.push(EncodedColumn::Numeric {
                        source,
                        name: col.name.clone(),
                        mean,
                        scale,
                    });
                }
                FeatureKind::Categorical => {
                    let levels: BTreeSet<&str> = rows
                        .iter()
                        .filter_map(|&r| records[r].get(source).as_category())
                        .collect();
                    for level in levels.into_iter().skip(1) {
                        columns.push(EncodedColumn::Indicator {
                            source,
                            name: format!("{}_{}", col.name, level),
                            level: level.to_string(),
                        });
                    }
                }
                FeatureKind::Text => {}
            }
        }
        Self { columns }
    }

    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| match c {
                EncodedColumn::Numeric { name, .. } | EncodedColumn::Indicator { name, .. } => {
                    name.as_str()
                }
            })
            .collect()
    }

    pub fn encode_record(&self, record: &Record) -> Vec<f64> {
        self.columns
            .iter()
            .map(|c| match c {
                EncodedColumn::Numeric {
                    source,
                    mean,
                    scale,
                    ..
                } => match record.get(*source) {
                    Value::Number(v) => (v - mean) / scale,
                    _ => 0.0,
                },
                EncodedColumn::Indicator { source, level, .. } => match record.get(*source) {
                    Value::Category(v) if v == level => 1.0,
                    _ => 0.0,
                },
            })
            .collect()
    }

    /// Encode the selected rows (row-major).
    pub fn encode(&self, records: &[Record], rows: &[usize]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|&r| self.encode_record(&records[r]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<FeatureColumn> {
        vec![
            FeatureColumn {
                name: "tenure".to_string(),
                kind: FeatureKind::Numeric,
            },
            FeatureColumn {
                name: "dept".to_string(),
                kind: FeatureKind::Categorical,
            },
            FeatureColumn {
                name: "notes".to_string(),
                kind: FeatureKind::Text,
            },
        ]
    }

    fn record(tenure: Option<f64>, dept: &str) -> Record {
        Record {
            values: vec![
                tenure.map(Value::Number).unwrap_or(Value::Missing),
                Value::Category(dept.to_string()),
                Value::Text("free text".to_string()),
            ],
        }
    }

    #[test]
    fn encodes_numeric_and_reference_coded_categories() {
        let records = vec![
            record(Some(1.0), "hr"),
            record(Some(3.0), "it"),
            record(None, "sales"),
            record(Some(100.0), "legal"),
        ];
        // Row 3 is not part of training.
        let encoder = FeatureEncoder::fit(&schema(), &records, &[0, 1, 2]);
        assert_eq!(encoder.names(), vec!["tenure", "dept_it", "dept_sales"]);

        let rows = encoder.encode(&records, &[0, 1, 2, 3]);
        assert_eq!(rows[0], vec![-1.0, 0.0, 0.0]);
        assert_eq!(rows[1], vec![1.0, 1.0, 0.0]);
        // Missing numeric → training mean; reference level → zeros.
        assert_eq!(rows[2], vec![0.0, 0.0, 1.0]);
        // Unseen level → zeros.
        assert_eq!(rows[3][1..], [0.0, 0.0]);
    }
}
