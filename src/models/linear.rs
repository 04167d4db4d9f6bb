//! Penalized linear models: ridge regression and ridge-logistic regression.
//!
//! Both are fitted through `math::solve_ridge`; logistic regression runs
//! iteratively reweighted least squares (IRLS) on top of it.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::math::solve_ridge;
use crate::models::FitError;

const IRLS_MAX_ITERS: usize = 50;
const IRLS_TOL: f64 = 1e-8;
const MIN_IRLS_WEIGHT: f64 = 1e-10;
/// Fitted probabilities this close to every label mean the classes are separated.
const SEPARATION_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Predictions go through the logistic link.
    pub logistic: bool,
}

impl LinearModel {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let eta = self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>();
        if self.logistic { sigmoid(eta) } else { eta }
    }
}

pub fn fit_ridge(rows: &[Vec<f64>], y: &[f64], penalty: f64) -> Result<LinearModel, FitError> {
    let x = design_matrix(rows)?;
    let y = DVector::from_column_slice(y);
    let beta = solve_ridge(&x, &y, penalty, None).ok_or(FitError::Singular)?;
    Ok(from_beta(&beta, false))
}

pub fn fit_logistic(rows: &[Vec<f64>], y: &[f64], penalty: f64) -> Result<LinearModel, FitError> {
    let x = design_matrix(rows)?;
    let (n, p) = x.shape();
    let mut beta = DVector::<f64>::zeros(p);

    for _ in 0..IRLS_MAX_ITERS {
        let eta = &x * &beta;
        let mut z = DVector::<f64>::zeros(n);
        let mut w = vec![0.0; n];
        for i in 0..n {
            let mu = sigmoid(eta[i]);
            let wi = (mu * (1.0 - mu)).max(MIN_IRLS_WEIGHT);
            w[i] = wi;
            z[i] = eta[i] + (y[i] - mu) / wi;
        }

        let next = solve_ridge(&x, &z, penalty, Some(&w)).ok_or(FitError::Singular)?;
        if next.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonConvergence(IRLS_MAX_ITERS));
        }
        let delta = (&next - &beta).amax();
        let size = next.amax();
        beta = next;
        // Without a penalty the likelihood has no maximum on separable data;
        // IRLS would walk off towards infinity (or stall on saturated weights).
        if penalty <= 0.0 && is_separated(&x, &beta, y) {
            return Err(FitError::Separation);
        }
        if delta < IRLS_TOL * (1.0 + size) {
            return Ok(from_beta(&beta, true));
        }
    }

    Err(FitError::NonConvergence(IRLS_MAX_ITERS))
}

fn is_separated(x: &DMatrix<f64>, beta: &DVector<f64>, y: &[f64]) -> bool {
    let eta = x * beta;
    eta.iter()
        .zip(y)
        .all(|(e, yi)| (yi - sigmoid(*e)).abs() < SEPARATION_EPS)
}

fn design_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, FitError> {
    let Some(first) = rows.first() else {
        return Err(FitError::EmptyTrainingSet);
    };
    let p = first.len();
    Ok(DMatrix::from_fn(rows.len(), p + 1, |i, j| {
        if j == 0 { 1.0 } else { rows[i][j - 1] }
    }))
}

fn from_beta(beta: &DVector<f64>, logistic: bool) -> LinearModel {
    LinearModel {
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        logistic,
    }
}

fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ridge_recovers_linear_relationship() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 10.0 - 1.0]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 4.0 + 2.5 * r[0]).collect();
        let model = fit_ridge(&rows, &y, 0.0).unwrap();
        assert!((model.intercept - 4.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.5).abs() < 1e-9);
        assert!((model.predict_row(&[0.5]) - 5.25).abs() < 1e-9);
    }

    #[test]
    fn logistic_fits_overlapping_classes() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 10) as f64 - 4.5]).collect();
        // Class 1 becomes more likely with x, with overlap in the middle.
        let y: Vec<f64> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let shift = if i % 3 == 0 { 3.0 } else { 0.0 };
                if r[0] + shift > 0.0 { 1.0 } else { 0.0 }
            })
            .collect();
        let model = fit_logistic(&rows, &y, 0.01).unwrap();
        assert!(model.coefficients[0] > 0.0);
        assert!(model.predict_row(&[4.0]) > model.predict_row(&[-4.0]));
        let p = model.predict_row(&[0.0]);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn unpenalized_logistic_on_separable_data_fails() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 - 4.5]).collect();
        let y: Vec<f64> = rows.iter().map(|r| if r[0] > 0.0 { 1.0 } else { 0.0 }).collect();
        assert!(matches!(
            fit_logistic(&rows, &y, 0.0),
            Err(FitError::Separation) | Err(FitError::NonConvergence(_)) | Err(FitError::Singular)
        ));
    }

    #[test]
    fn empty_training_set_is_an_error() {
        assert!(matches!(
            fit_ridge(&[], &[], 1.0),
            Err(FitError::EmptyTrainingSet)
        ));
    }
}
