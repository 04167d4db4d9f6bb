//! Seeded synthetic HR extracts for demos and tests.
//!
//! Two shapes:
//!
//! - `wages`: yearly wage (regression target) driven by job level, tenure,
//!   department, education and performance, with log-normal noise
//! - `promotion`: the same workforce with a `promoted` yes/no flag drawn
//!   from a logistic model of rating, tenure and level
//!
//! Both carry an `employee_id` column (an identifier to exclude) and a free
//! text `notes` column that the encoder ignores.

use clap::ValueEnum;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::RawTable;
use crate::error::AppError;

const DEPARTMENTS: [(&str, f64); 5] = [
    ("engineering", 9_000.0),
    ("finance", 6_000.0),
    ("hr", 0.0),
    ("operations", 1_500.0),
    ("sales", 3_000.0),
];
const EDUCATION: [(&str, f64); 3] = [("secondary", 0.0), ("bachelor", 4_000.0), ("master", 7_500.0)];
const NOTE_WORDS: [&str; 6] = ["referral", "relocated", "mentor", "remote", "part-time", "rehire"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthKind {
    Wages,
    Promotion,
}

impl SynthKind {
    /// Name of the generated target column.
    pub fn target(self) -> &'static str {
        match self {
            SynthKind::Wages => "wage",
            SynthKind::Promotion => "promoted",
        }
    }
}

struct Employee {
    department: usize,
    education: usize,
    level: u32,
    tenure: f64,
    rating: u32,
}

/// Generate `rows` employees.
pub fn generate(kind: SynthKind, rows: usize, seed: u64) -> Result<RawTable, AppError> {
    if rows == 0 {
        return Err(AppError::new(2, "Row count must be > 0."));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let tenure_dist = LogNormal::<f64>::new(1.2, 0.7)
        .map_err(|e| AppError::new(4, format!("Tenure distribution error: {e}")))?;
    let wage_noise = LogNormal::new(0.0, 0.08)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let latent = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let headers = [
        "employee_id",
        "department",
        "education",
        "job_level",
        "tenure_years",
        "performance_rating",
        "notes",
        kind.target(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let e = Employee {
            department: rng.gen_range(0..DEPARTMENTS.len()),
            education: rng.gen_range(0..EDUCATION.len()),
            level: rng.gen_range(1..=5),
            tenure: tenure_dist.sample(&mut rng).min(40.0),
            rating: rng.gen_range(1..=5),
        };
        let notes = format!(
            "{} since {} (ref {:05})",
            NOTE_WORDS[rng.gen_range(0..NOTE_WORDS.len())],
            2024 - e.tenure.floor() as i64,
            i * 37 % 100_000
        );

        let target = match kind {
            SynthKind::Wages => {
                let expected = 32_000.0
                    + 8_500.0 * f64::from(e.level - 1)
                    + 900.0 * e.tenure.min(20.0)
                    + DEPARTMENTS[e.department].1
                    + EDUCATION[e.education].1
                    + 1_200.0 * (f64::from(e.rating) - 3.0);
                format!("{:.0}", expected * wage_noise.sample(&mut rng))
            }
            SynthKind::Promotion => {
                let logit = -1.0
                    + 0.9 * (f64::from(e.rating) - 3.0)
                    + 0.15 * e.tenure.min(15.0)
                    - 0.35 * f64::from(e.level - 1)
                    + 0.4 * latent.sample(&mut rng);
                let p = 1.0 / (1.0 + (-logit).exp());
                let label = if rng.gen_bool(p.clamp(0.01, 0.99)) { "yes" } else { "no" };
                label.to_string()
            }
        };

        out.push(vec![
            format!("E{:05}", i + 1),
            DEPARTMENTS[e.department].0.to_string(),
            EDUCATION[e.education].0.to_string(),
            e.level.to_string(),
            format!("{:.1}", e.tenure),
            e.rating.to_string(),
            notes,
            target,
        ]);
    }

    Ok(RawTable {
        headers,
        rows: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, DatasetOptions, FeatureKind, TaskKind};

    fn dataset(kind: SynthKind, rows: usize) -> Dataset {
        let table = generate(kind, rows, 3).unwrap();
        Dataset::from_raw(
            &table,
            &DatasetOptions {
                target: kind.target().to_string(),
                exclude: vec!["employee_id".to_string()],
                ..DatasetOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn wages_are_a_regression_dataset() {
        let ds = dataset(SynthKind::Wages, 200);
        assert_eq!(ds.task(), TaskKind::Regression);
        assert_eq!(ds.len(), 200);
        let kinds: Vec<FeatureKind> = ds.schema().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FeatureKind::Categorical,
                FeatureKind::Categorical,
                FeatureKind::Numeric,
                FeatureKind::Numeric,
                FeatureKind::Numeric,
                FeatureKind::Text,
            ]
        );
        assert!(ds.targets().iter().all(|w| *w > 10_000.0));
    }

    #[test]
    fn promotion_has_both_classes() {
        let ds = dataset(SynthKind::Promotion, 300);
        assert_eq!(ds.task(), TaskKind::Classification);
        let positives = ds.targets().iter().filter(|y| **y == 1.0).count();
        assert!(positives > 10 && positives < 290, "positives = {positives}");
    }

    #[test]
    fn same_seed_same_table() {
        let a = generate(SynthKind::Wages, 50, 9).unwrap();
        let b = generate(SynthKind::Wages, 50, 9).unwrap();
        assert_eq!(a.rows, b.rows);
        assert!(generate(SynthKind::Wages, 0, 9).is_err());
    }
}
