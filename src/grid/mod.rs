//! Candidate set construction.
//!
//! Each algorithm declares a typed grid: every tunable knob is an [`Axis`],
//! either an explicit list of values or a numeric range. The candidate set is
//! the per-algorithm cross product, optionally capped by a sub-sample.
//!
//! Parameter domains are checked here, before any fitting happens, so a bad
//! knob is a configuration error rather than a failed trial.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::domain::{AlgorithmKind, Candidate, CandidateId, KnnWeighting, Params};
use crate::error::RaceError;

/// Spacing of a range axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

/// `steps` points between `min` and `max` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
    #[serde(default)]
    pub scale: Scale,
}

/// The values one knob may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axis<T> {
    Fixed(T),
    Values(Vec<T>),
    Range(RangeSpec),
}

impl<T: Clone> Axis<T> {
    fn resolve_with(
        &self,
        from_range: impl Fn(&RangeSpec) -> Result<Vec<T>, String>,
    ) -> Result<Vec<T>, String> {
        match self {
            Axis::Fixed(v) => Ok(vec![v.clone()]),
            Axis::Values(values) => Ok(values.clone()),
            Axis::Range(spec) => from_range(spec),
        }
    }
}

impl Axis<f64> {
    pub fn resolve(&self) -> Result<Vec<f64>, String> {
        self.resolve_with(range_values)
    }
}

impl Axis<usize> {
    /// Ranges are rounded to integers; duplicates produced by rounding are dropped.
    pub fn resolve(&self) -> Result<Vec<usize>, String> {
        self.resolve_with(|spec| {
            if spec.min < 0.0 {
                return Err(format!("integer range must be >= 0, got min={}", spec.min));
            }
            let mut out: Vec<usize> = range_values(spec)?
                .into_iter()
                .map(|v| v.round() as usize)
                .collect();
            out.dedup();
            Ok(out)
        })
    }
}

impl Axis<KnnWeighting> {
    pub fn resolve(&self) -> Result<Vec<KnnWeighting>, String> {
        self.resolve_with(|_| Err("weighting does not accept a numeric range".to_string()))
    }
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, String> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max >= min) {
        return Err(format!(
            "Invalid log range: min={min}, max={max} (must be finite, >0, and max>=min)."
        ));
    }
    Ok(spaced(min.ln(), max.ln(), steps)
        .into_iter()
        .map(f64::exp)
        .collect())
}

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linear_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, String> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(format!(
            "Invalid range: min={min}, max={max} (must be finite and max>=min)."
        ));
    }
    Ok(spaced(min, max, steps))
}

fn spaced(lo: f64, hi: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (steps as f64 - 1.0);
            (0..steps).map(|i| lo + step * i as f64).collect()
        }
    }
}

fn range_values(spec: &RangeSpec) -> Result<Vec<f64>, String> {
    match spec.scale {
        Scale::Linear => linear_space(spec.min, spec.max, spec.steps),
        Scale::Log => log_space(spec.min, spec.max, spec.steps),
    }
}

/// Typed tunable surface of one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlgorithmGrid {
    Linear {
        penalty: Axis<f64>,
    },
    Knn {
        neighbors: Axis<usize>,
        #[serde(default = "default_weighting")]
        weighting: Axis<KnnWeighting>,
    },
    Tree {
        max_depth: Axis<usize>,
        #[serde(default = "default_min_leaf")]
        min_leaf: Axis<usize>,
    },
    Forest {
        #[serde(default = "default_trees")]
        trees: Axis<usize>,
        max_depth: Axis<usize>,
        #[serde(default = "default_min_leaf")]
        min_leaf: Axis<usize>,
        #[serde(default = "default_feature_fraction")]
        feature_fraction: Axis<f64>,
    },
}

fn default_weighting() -> Axis<KnnWeighting> {
    Axis::Fixed(KnnWeighting::Uniform)
}

fn default_min_leaf() -> Axis<usize> {
    Axis::Fixed(5)
}

fn default_trees() -> Axis<usize> {
    Axis::Fixed(50)
}

fn default_feature_fraction() -> Axis<f64> {
    Axis::Fixed(0.5)
}

impl AlgorithmGrid {
    pub fn algorithm(&self) -> AlgorithmKind {
        match self {
            AlgorithmGrid::Linear { .. } => AlgorithmKind::Linear,
            AlgorithmGrid::Knn { .. } => AlgorithmKind::Knn,
            AlgorithmGrid::Tree { .. } => AlgorithmKind::Tree,
            AlgorithmGrid::Forest { .. } => AlgorithmKind::Forest,
        }
    }

    /// Grids used when the configuration does not list any algorithms.
    pub fn defaults() -> Vec<AlgorithmGrid> {
        vec![
            AlgorithmGrid::Linear {
                penalty: Axis::Range(RangeSpec {
                    min: 1e-4,
                    max: 10.0,
                    steps: 6,
                    scale: Scale::Log,
                }),
            },
            AlgorithmGrid::Knn {
                neighbors: Axis::Values(vec![3, 5, 9, 15]),
                weighting: Axis::Values(vec![KnnWeighting::Uniform, KnnWeighting::InverseDistance]),
            },
            AlgorithmGrid::Tree {
                max_depth: Axis::Values(vec![2, 4, 6, 8]),
                min_leaf: Axis::Values(vec![2, 5, 10]),
            },
            AlgorithmGrid::Forest {
                trees: Axis::Fixed(50),
                max_depth: Axis::Values(vec![6, 10]),
                min_leaf: Axis::Values(vec![2, 5]),
                feature_fraction: Axis::Values(vec![0.33, 0.66]),
            },
        ]
    }

    /// Full cross product of this grid, in axis order (first axis outermost).
    pub fn expand(&self) -> Result<Vec<Params>, RaceError> {
        let algorithm = self.algorithm().name();
        let axis_err = |knob: &str, reason: String| {
            RaceError::invalid(format!("{algorithm}.{knob}: {reason}"))
        };

        let params = match self {
            AlgorithmGrid::Linear { penalty } => {
                let penalty = penalty.resolve().map_err(|e| axis_err("penalty", e))?;
                penalty
                    .into_iter()
                    .map(|penalty| Params::Linear { penalty })
                    .collect()
            }
            AlgorithmGrid::Knn {
                neighbors,
                weighting,
            } => {
                let neighbors = neighbors.resolve().map_err(|e| axis_err("neighbors", e))?;
                let weighting = weighting.resolve().map_err(|e| axis_err("weighting", e))?;
                let mut out = Vec::new();
                for &k in &neighbors {
                    for &w in &weighting {
                        out.push(Params::Knn {
                            neighbors: k,
                            weighting: w,
                        });
                    }
                }
                out
            }
            AlgorithmGrid::Tree {
                max_depth,
                min_leaf,
            } => {
                let depth = max_depth.resolve().map_err(|e| axis_err("max_depth", e))?;
                let leaf = min_leaf.resolve().map_err(|e| axis_err("min_leaf", e))?;
                let mut out = Vec::new();
                for &d in &depth {
                    for &l in &leaf {
                        out.push(Params::Tree {
                            max_depth: d,
                            min_leaf: l,
                        });
                    }
                }
                out
            }
            AlgorithmGrid::Forest {
                trees,
                max_depth,
                min_leaf,
                feature_fraction,
            } => {
                let trees = trees.resolve().map_err(|e| axis_err("trees", e))?;
                let depth = max_depth.resolve().map_err(|e| axis_err("max_depth", e))?;
                let leaf = min_leaf.resolve().map_err(|e| axis_err("min_leaf", e))?;
                let frac = feature_fraction
                    .resolve()
                    .map_err(|e| axis_err("feature_fraction", e))?;
                let mut out = Vec::new();
                for &t in &trees {
                    for &d in &depth {
                        for &l in &leaf {
                            for &f in &frac {
                                out.push(Params::Forest {
                                    trees: t,
                                    max_depth: d,
                                    min_leaf: l,
                                    feature_fraction: f,
                                });
                            }
                        }
                    }
                }
                out
            }
        };
        Ok(params)
    }
}

/// How a grid is thinned when it is larger than the requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleMethod {
    /// Seeded uniform sample without replacement.
    #[default]
    Random,
    /// Evenly spaced picks through the enumeration order (quasi-random).
    Regular,
}

/// Cap on the number of candidates drawn from each algorithm's grid.
///
/// The cap applies to every algorithm separately, so a set built from `m`
/// algorithms holds at most `m * size` candidates. An algorithm whose product
/// is already within the cap keeps all of its combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSample {
    pub size: usize,
    #[serde(default)]
    pub method: SampleMethod,
}

/// Build the candidate set: expand, validate, sub-sample, number.
pub fn build_candidates(
    grids: &[AlgorithmGrid],
    sample: Option<&GridSample>,
    seed: u64,
) -> Result<Vec<Candidate>, RaceError> {
    if grids.is_empty() {
        return Err(RaceError::invalid("No algorithms configured."));
    }
    if let Some(sample) = sample {
        if sample.size == 0 {
            return Err(RaceError::invalid("Grid sample size must be >= 1."));
        }
    }

    let mut candidates = Vec::new();
    for (grid_idx, grid) in grids.iter().enumerate() {
        let algorithm = grid.algorithm().name();
        let combos = grid.expand()?;
        if combos.is_empty() {
            return Err(RaceError::EmptyGrid {
                algorithm: algorithm.to_string(),
                reason: "an axis has no values".to_string(),
            });
        }
        for params in &combos {
            params
                .validate()
                .map_err(|reason| RaceError::invalid(format!("{algorithm}: {reason}")))?;
        }

        let picked = match sample {
            Some(sample) if sample.size < combos.len() => {
                let idx = pick_indices(combos.len(), sample, seed.wrapping_add(grid_idx as u64));
                idx.into_iter().map(|i| combos[i].clone()).collect()
            }
            _ => combos,
        };

        for params in picked {
            candidates.push(Candidate {
                id: CandidateId(candidates.len()),
                params,
            });
        }
    }

    Ok(candidates)
}

fn pick_indices(n: usize, sample: &GridSample, seed: u64) -> Vec<usize> {
    let size = sample.size.min(n);
    match sample.method {
        SampleMethod::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut idx: Vec<usize> = (0..n).collect();
            idx.shuffle(&mut rng);
            idx.truncate(size);
            idx.sort_unstable();
            idx
        }
        SampleMethod::Regular => (0..size).map(|i| i * n / size).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knn_and_tree() -> Vec<AlgorithmGrid> {
        vec![
            AlgorithmGrid::Knn {
                neighbors: Axis::Values(vec![1, 3, 5, 7]),
                weighting: Axis::Values(vec![KnnWeighting::Uniform, KnnWeighting::InverseDistance]),
            },
            AlgorithmGrid::Tree {
                max_depth: Axis::Range(RangeSpec {
                    min: 2.0,
                    max: 6.0,
                    steps: 3,
                    scale: Scale::Linear,
                }),
                min_leaf: Axis::Values(vec![1, 5]),
            },
        ]
    }

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
        assert!((v[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn candidate_count_is_product_of_axes() {
        let candidates = build_candidates(&knn_and_tree(), None, 0).unwrap();
        assert_eq!(candidates.len(), 4 * 2 + 3 * 2);
        for (i, c) in candidates.iter().enumerate() {
            assert_eq!(c.id, CandidateId(i));
        }
        assert_eq!(
            candidates[8].params,
            Params::Tree {
                max_depth: 2,
                min_leaf: 1
            }
        );
    }

    #[test]
    fn sub_sample_caps_each_algorithm() {
        let sample = GridSample {
            size: 3,
            method: SampleMethod::Random,
        };
        let candidates = build_candidates(&knn_and_tree(), Some(&sample), 7).unwrap();
        assert_eq!(candidates.len(), 6);
        for algorithm in [AlgorithmKind::Knn, AlgorithmKind::Tree] {
            let n = candidates
                .iter()
                .filter(|c| c.params.algorithm() == algorithm)
                .count();
            assert_eq!(n, 3, "{algorithm:?}");
        }
        assert!(candidates.len() <= knn_and_tree().len() * sample.size);

        let again = build_candidates(&knn_and_tree(), Some(&sample), 7).unwrap();
        assert_eq!(candidates, again);

        let large = GridSample {
            size: 100,
            method: SampleMethod::Regular,
        };
        let candidates = build_candidates(&knn_and_tree(), Some(&large), 7).unwrap();
        assert_eq!(candidates.len(), 14);
    }

    #[test]
    fn regular_sample_is_evenly_spaced() {
        let sample = GridSample {
            size: 2,
            method: SampleMethod::Regular,
        };
        assert_eq!(pick_indices(8, &sample, 0), vec![0, 4]);
    }

    #[test]
    fn empty_axis_is_an_empty_grid() {
        let grids = vec![AlgorithmGrid::Linear {
            penalty: Axis::Values(vec![]),
        }];
        assert!(matches!(
            build_candidates(&grids, None, 0),
            Err(RaceError::EmptyGrid { .. })
        ));

        let grids = vec![AlgorithmGrid::Linear {
            penalty: Axis::Range(RangeSpec {
                min: 0.1,
                max: 1.0,
                steps: 0,
                scale: Scale::Log,
            }),
        }];
        assert!(matches!(
            build_candidates(&grids, None, 0),
            Err(RaceError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn out_of_domain_values_are_configuration_errors() {
        let grids = vec![AlgorithmGrid::Linear {
            penalty: Axis::Values(vec![0.1, -1.0]),
        }];
        assert!(matches!(
            build_candidates(&grids, None, 0),
            Err(RaceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn grids_deserialize_from_toml() {
        let text = r#"
            [[algorithms]]
            kind = "linear"
            penalty = { min = 0.001, max = 1.0, steps = 4, scale = "log" }

            [[algorithms]]
            kind = "knn"
            neighbors = [5, 11]
            weighting = "inverse-distance"

            [[algorithms]]
            kind = "forest"
            max_depth = 8
        "#;
        #[derive(Deserialize)]
        struct Wrapper {
            algorithms: Vec<AlgorithmGrid>,
        }
        let parsed: Wrapper = toml::from_str(text).unwrap();
        let candidates = build_candidates(&parsed.algorithms, None, 0).unwrap();
        assert_eq!(candidates.len(), 4 + 2 + 1);
        assert_eq!(
            candidates[6].params,
            Params::Forest {
                trees: 50,
                max_depth: 8,
                min_leaf: 5,
                feature_fraction: 0.5
            }
        );
    }
}
