//! CART regression trees and random forests.
//!
//! Splits minimise the summed squared error of the two children. On a `0/1`
//! target that is the Gini criterion, so the same tree serves classification
//! and leaf means are class probabilities.

use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::derive_seed;

/// Minimum SSE reduction for a split to be worth making.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct TreeSettings {
    /// Number of split levels below the root.
    pub max_depth: usize,
    /// Minimum training rows in each leaf.
    pub min_leaf: usize,
    /// Share of features drawn as split candidates at each node.
    pub feature_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Nodes are stored flat; index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    nodes: Vec<TreeNode>,
}

impl TreeModel {
    pub fn fit(rows: &[Vec<f64>], y: &[f64], settings: &TreeSettings, seed: u64) -> Self {
        let sample: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        grow(rows, y, sample, settings, &mut rng)
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if x <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Bagged trees with per-node feature sub-sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    trees: Vec<TreeModel>,
}

impl ForestModel {
    /// Grow `trees` trees in parallel; tree `t` uses a seed derived from
    /// `(seed, t)`, so the result does not depend on the thread count.
    pub fn fit(rows: &[Vec<f64>], y: &[f64], trees: usize, settings: &TreeSettings, seed: u64) -> Self {
        let n = rows.len();
        let trees = (0..trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                grow(rows, y, sample, settings, &mut rng)
            })
            .collect();
        Self { trees }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn grow(
    rows: &[Vec<f64>],
    y: &[f64],
    sample: Vec<usize>,
    settings: &TreeSettings,
    rng: &mut StdRng,
) -> TreeModel {
    let mut nodes = Vec::new();
    // Work stack of (node slot, rows, depth); slots are reserved up front.
    nodes.push(TreeNode::Leaf { value: 0.0 });
    let mut stack = vec![(0usize, sample, 0usize)];
    let width = rows.first().map_or(0, Vec::len);

    while let Some((slot, sample, depth)) = stack.pop() {
        let value = sample.iter().map(|&i| y[i]).sum::<f64>() / sample.len().max(1) as f64;
        let split = if depth < settings.max_depth && sample.len() >= 2 * settings.min_leaf {
            best_split(rows, y, &sample, width, settings, rng)
        } else {
            None
        };

        let Some(split) = split else {
            nodes[slot] = TreeNode::Leaf { value };
            continue;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| rows[i][split.feature] <= split.threshold);
        let left = nodes.len();
        let right = left + 1;
        nodes.push(TreeNode::Leaf { value });
        nodes.push(TreeNode::Leaf { value });
        nodes[slot] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        stack.push((right, right_rows, depth + 1));
        stack.push((left, left_rows, depth + 1));
    }

    TreeModel { nodes }
}

fn best_split(
    rows: &[Vec<f64>],
    y: &[f64],
    sample: &[usize],
    width: usize,
    settings: &TreeSettings,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    if width == 0 {
        return None;
    }
    let mut features: Vec<usize> = (0..width).collect();
    let take = ((settings.feature_fraction * width as f64).ceil() as usize).clamp(1, width);
    if take < width {
        features.shuffle(rng);
        features.truncate(take);
        features.sort_unstable();
    }

    let n = sample.len() as f64;
    let total: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total * total / n;
    if parent_sse <= MIN_GAIN {
        return None;
    }

    let mut best: Option<BestSplit> = None;
    let mut order = sample.to_vec();
    for &feature in &features {
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 0..order.len() - 1 {
            let yi = y[order[pos]];
            left_sum += yi;
            left_sq += yi * yi;

            let n_left = pos + 1;
            let n_right = order.len() - n_left;
            if n_left < settings.min_leaf || n_right < settings.min_leaf {
                continue;
            }
            let here = rows[order[pos]][feature];
            let next = rows[order[pos + 1]][feature];
            if here == next {
                continue;
            }

            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;
            if gain > MIN_GAIN && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: 0.5 * (here + next),
                    gain,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y steps at x = 5; the second feature is noise.
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64 / 2.0, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| if r[0] < 5.0 { 1.0 } else { 3.0 }).collect();
        (rows, y)
    }

    fn settings(max_depth: usize, min_leaf: usize) -> TreeSettings {
        TreeSettings {
            max_depth,
            min_leaf,
            feature_fraction: 1.0,
        }
    }

    #[test]
    fn tree_finds_the_step() {
        let (rows, y) = step_data();
        let tree = TreeModel::fit(&rows, &y, &settings(3, 1), 0);
        // A single split separates the two levels perfectly.
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[1.0, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[8.0, 0.0]), 3.0);
    }

    #[test]
    fn depth_and_leaf_size_limit_growth() {
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| r[0] * r[0]).collect();
        let shallow = TreeModel::fit(&rows, &y, &settings(2, 1), 0);
        assert!(shallow.depth() <= 2);
        assert!(shallow.node_count() <= 7);

        let stump = TreeModel::fit(&rows, &y, &settings(10, 16), 0);
        assert_eq!(stump.depth(), 1);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let tree = TreeModel::fit(&rows, &[2.0; 10], &settings(5, 1), 0);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(&[100.0]), 2.0);
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let (rows, y) = step_data();
        let s = TreeSettings {
            max_depth: 3,
            min_leaf: 2,
            feature_fraction: 0.5,
        };
        let a = ForestModel::fit(&rows, &y, 8, &s, 99);
        let b = ForestModel::fit(&rows, &y, 8, &s, 99);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        let low = a.predict_row(&[0.0, 0.0]);
        let high = a.predict_row(&[9.5, 0.0]);
        assert!(low < high);
    }
}
