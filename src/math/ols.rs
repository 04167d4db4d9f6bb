//! Weighted, ridge-penalized least squares.
//!
//! Learners repeatedly solve small linear problems of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2 + λ Σ_{j≥1} β_j^2
//! ```
//!
//! Column 0 is the intercept and is never penalized. The penalty is folded in
//! as extra rows `sqrt(λ) e_j` and the stacked system goes through an SVD
//! solve, which copes with tall, wide and rank-deficient design matrices.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Ridge solve with optional per-row weights. Column 0 is the unpenalized intercept.
pub fn solve_ridge(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalty: f64,
    weights: Option<&[f64]>,
) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    let extra = if penalty > 0.0 { p.saturating_sub(1) } else { 0 };

    let mut xa = DMatrix::<f64>::zeros(n + extra, p);
    let mut ya = DVector::<f64>::zeros(n + extra);
    for i in 0..n {
        let sw = weights.map(|w| w[i].max(0.0).sqrt()).unwrap_or(1.0);
        for j in 0..p {
            xa[(i, j)] = x[(i, j)] * sw;
        }
        ya[i] = y[i] * sw;
    }
    let s = penalty.max(0.0).sqrt();
    for j in 0..extra {
        xa[(n + j, j + 1)] = s;
    }

    solve_least_squares(&xa, &ya)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ridge_shrinks_slope_but_not_intercept() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, -1.5, 1.0, -0.5, 1.0, 0.5, 1.0, 1.5]);
        let y = DVector::from_row_slice(&[7.0, 9.0, 11.0, 13.0]);

        let plain = solve_ridge(&x, &y, 0.0, None).unwrap();
        assert!((plain[1] - 2.0).abs() < 1e-10);

        let shrunk = solve_ridge(&x, &y, 5.0, None).unwrap();
        assert!(shrunk[1] < plain[1]);
        // Centered predictor: intercept stays at the mean of y.
        assert!((shrunk[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_drop_rows() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 100.0]);
        let beta = solve_ridge(&x, &y, 0.0, Some(&[1.0, 1.0, 0.0])).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-9);
        assert!((beta[1] - 3.0).abs() < 1e-9);
    }
}
