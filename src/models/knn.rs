//! k-nearest neighbours on encoded (standardized) rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::KnnWeighting;

/// Lazy learner: keeps the training rows and averages the closest targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    neighbors: usize,
    weighting: KnnWeighting,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl KnnModel {
    pub fn fit(rows: &[Vec<f64>], y: &[f64], neighbors: usize, weighting: KnnWeighting) -> Self {
        Self {
            neighbors: neighbors.max(1),
            weighting,
            rows: rows.to_vec(),
            targets: y.to_vec(),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.rows.is_empty() {
            return f64::NAN;
        }
        let mut dist: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let d2: f64 = r.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d2.sqrt(), i)
            })
            .collect();
        // Ties break on training order so predictions are reproducible.
        dist.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
        let nearest = &dist[..self.neighbors.min(dist.len())];

        match self.weighting {
            KnnWeighting::Uniform => {
                nearest.iter().map(|&(_, i)| self.targets[i]).sum::<f64>() / nearest.len() as f64
            }
            KnnWeighting::InverseDistance => {
                let exact: Vec<usize> = nearest
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, i)| i)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().map(|&i| self.targets[i]).sum::<f64>()
                        / exact.len() as f64;
                }
                let (num, den) = nearest.iter().fold((0.0, 0.0), |(num, den), &(d, i)| {
                    (num + self.targets[i] / d, den + 1.0 / d)
                });
                num / den
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0]];
        let y = vec![0.0, 1.0, 2.0, 10.0];
        (rows, y)
    }

    #[test]
    fn uniform_averages_nearest_targets() {
        let (rows, y) = line();
        let model = KnnModel::fit(&rows, &y, 2, KnnWeighting::Uniform);
        assert!((model.predict_row(&[0.4]) - 0.5).abs() < 1e-12);
        assert!((model.predict_row(&[9.0]) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_distance_favours_closer_points() {
        let (rows, y) = line();
        let model = KnnModel::fit(&rows, &y, 2, KnnWeighting::InverseDistance);
        let p = model.predict_row(&[0.25]);
        assert!(p < 0.5 && p > 0.0);
        // Exact hit returns the stored target.
        assert_eq!(model.predict_row(&[2.0]), 2.0);
    }

    #[test]
    fn k_larger_than_training_set_uses_all_rows() {
        let (rows, y) = line();
        let model = KnnModel::fit(&rows, &y, 50, KnnWeighting::Uniform);
        assert!((model.predict_row(&[0.0]) - 13.0 / 4.0).abs() < 1e-12);
    }
}
