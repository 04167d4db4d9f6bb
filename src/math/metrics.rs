//! Scoring metrics.
//!
//! Classification metrics take `actual` as `0.0`/`1.0` and `predicted` as the
//! probability of the positive class. A metric that is undefined for its
//! inputs (e.g. AUC with a single class) comes back as `NaN`.

use std::cmp::Ordering;

use crate::domain::MetricKind;

const PROB_EPS: f64 = 1e-15;

/// Score predictions with the given metric.
pub fn score(metric: MetricKind, actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    match metric {
        MetricKind::Rmse => rmse(actual, predicted),
        MetricKind::Mae => mae(actual, predicted),
        MetricKind::Rsq => rsq(actual, predicted),
        MetricKind::RocAuc => roc_auc(actual, predicted),
        MetricKind::Accuracy => accuracy(actual, predicted),
        MetricKind::LogLoss => log_loss(actual, predicted),
    }
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sse / actual.len() as f64).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Squared Pearson correlation between actual and predicted values.
pub fn rsq(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let ma = actual.iter().sum::<f64>() / n;
    let mp = predicted.iter().sum::<f64>() / n;
    let mut sap = 0.0;
    let mut saa = 0.0;
    let mut spp = 0.0;
    for (a, p) in actual.iter().zip(predicted) {
        sap += (a - ma) * (p - mp);
        saa += (a - ma).powi(2);
        spp += (p - mp).powi(2);
    }
    if saa <= 0.0 || spp <= 0.0 {
        return f64::NAN;
    }
    sap * sap / (saa * spp)
}

/// Area under the ROC curve (Mann–Whitney form, ties get average ranks).
pub fn roc_auc(actual: &[f64], predicted: &[f64]) -> f64 {
    let n_pos = actual.iter().filter(|&&a| a >= 0.5).count();
    let n_neg = actual.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..predicted.len()).collect();
    order.sort_by(|&a, &b| {
        predicted[a]
            .partial_cmp(&predicted[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && predicted[order[j + 1]] == predicted[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the average rank.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if actual[idx] >= 0.5 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

/// Share of rows where `p >= 0.5` agrees with the label.
pub fn accuracy(actual: &[f64], predicted: &[f64]) -> f64 {
    let hits = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| (**a >= 0.5) == (**p >= 0.5))
        .count();
    hits as f64 / actual.len() as f64
}

pub fn log_loss(actual: &[f64], predicted: &[f64]) -> f64 {
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
            -(a * p.ln() + (1.0 - a) * (1.0 - p).ln())
        })
        .sum();
    total / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_metrics() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let p = [1.0, 2.0, 3.0, 6.0];
        assert!((rmse(&a, &p) - 1.0).abs() < 1e-12);
        assert!((mae(&a, &p) - 0.5).abs() < 1e-12);
        assert!((rsq(&a, &a) - 1.0).abs() < 1e-12);
        assert!(rsq(&a, &[2.0; 4]).is_nan());
    }

    #[test]
    fn auc_handles_ties_and_perfect_ranking() {
        let a = [0.0, 0.0, 1.0, 1.0];
        assert!((roc_auc(&a, &[0.1, 0.2, 0.8, 0.9]) - 1.0).abs() < 1e-12);
        assert!((roc_auc(&a, &[0.9, 0.8, 0.2, 0.1])).abs() < 1e-12);
        assert!((roc_auc(&a, &[0.5; 4]) - 0.5).abs() < 1e-12);
        // One positive outranks one of two negatives.
        assert!((roc_auc(&[0.0, 1.0, 0.0], &[0.1, 0.5, 0.7]) - 0.5).abs() < 1e-12);
        assert!(roc_auc(&[1.0, 1.0], &[0.3, 0.4]).is_nan());
    }

    #[test]
    fn classification_metrics() {
        let a = [1.0, 0.0, 1.0, 0.0];
        let p = [0.9, 0.2, 0.4, 0.6];
        assert!((accuracy(&a, &p) - 0.5).abs() < 1e-12);
        let ll = log_loss(&[1.0], &[0.5]);
        assert!((ll - 2.0_f64.ln()).abs() < 1e-12);
        assert!(log_loss(&[1.0], &[0.0]).is_finite());
    }

    #[test]
    fn score_rejects_mismatched_inputs() {
        assert!(score(MetricKind::Rmse, &[1.0], &[]).is_nan());
        assert!(score(MetricKind::Rmse, &[], &[]).is_nan());
    }
}
