//! Train/validation partitions.
//!
//! Two modes:
//!
//! - **k-fold**: rows are shuffled and dealt round-robin into `k` disjoint
//!   folds; each partition validates on one fold and trains on the rest.
//!   `repeats > 1` reshuffles and deals again (repeated cross-validation).
//! - **bootstrap**: training rows are drawn with replacement; validation is
//!   the out-of-bag rows.
//!
//! With stratification on, shuffling/drawing happens within strata (class
//! label, or target quartile for regression) so every partition keeps the
//! target's distribution.
//!
//! Output order is the race order. Everything is driven by a single seeded
//! RNG, so a seed fully determines the partitions.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::{Dataset, Partition, PartitionId, ResampleConfig, SamplingMode, TaskKind};
use crate::error::RaceError;

/// Bootstrap draws with an empty out-of-bag set are redrawn at most this often.
const MAX_REDRAWS: usize = 100;
/// Strata smaller than this disable stratification.
const MIN_STRATUM: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleSpec {
    pub mode: SamplingMode,
    pub partitions: usize,
    pub repeats: usize,
    pub stratify: bool,
    pub seed: u64,
}

impl ResampleSpec {
    pub fn from_config(config: &ResampleConfig, seed: u64) -> Self {
        Self {
            mode: config.mode,
            partitions: config.partitions,
            repeats: config.repeats,
            stratify: config.stratify,
            seed,
        }
    }

    /// Number of partitions `resample` will return.
    pub fn total(&self) -> usize {
        match self.mode {
            SamplingMode::Kfold => self.partitions * self.repeats,
            SamplingMode::Bootstrap => self.partitions,
        }
    }
}

/// Draw partitions over all rows of `dataset`.
pub fn resample(dataset: &Dataset, spec: &ResampleSpec) -> Result<Vec<Partition>, RaceError> {
    let k = spec.partitions;
    if k < 2 {
        return Err(RaceError::invalid(format!(
            "At least 2 partitions are required, got {k}."
        )));
    }
    if spec.repeats == 0 {
        return Err(RaceError::invalid("repeats must be >= 1"));
    }
    let n = dataset.len();
    if n < k {
        return Err(RaceError::invalid(format!(
            "Dataset has {n} rows, fewer than the {k} partitions requested."
        )));
    }

    let strata = if spec.stratify {
        strata_for(dataset)
    } else {
        vec![(0..n).collect()]
    };
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let partitions = match spec.mode {
        SamplingMode::Kfold => kfold(n, k, spec.repeats, &strata, &mut rng),
        SamplingMode::Bootstrap => {
            if spec.repeats > 1 {
                tracing::debug!("repeats only applies to k-fold; drawing {k} bootstraps");
            }
            bootstrap(n, k, &strata, &mut rng)?
        }
    };
    tracing::debug!(
        mode = ?spec.mode,
        partitions = partitions.len(),
        strata = strata.len(),
        "resampled dataset"
    );
    Ok(partitions)
}

fn kfold(
    n: usize,
    k: usize,
    repeats: usize,
    strata: &[Vec<usize>],
    rng: &mut StdRng,
) -> Vec<Partition> {
    let mut out = Vec::with_capacity(k * repeats);
    for repeat in 0..repeats {
        let mut fold_of = vec![0usize; n];
        // Dealing continues across strata so fold sizes differ by at most one.
        let mut next = 0usize;
        for stratum in strata {
            let mut rows = stratum.clone();
            rows.shuffle(rng);
            for row in rows {
                fold_of[row] = next % k;
                next += 1;
            }
        }

        for fold in 0..k {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&row| fold_of[row] == fold);
            let label = if repeats > 1 {
                format!("Fold{:02}.Repeat{}", fold + 1, repeat + 1)
            } else {
                format!("Fold{:02}", fold + 1)
            };
            out.push(Partition {
                id: PartitionId(out.len()),
                label,
                train,
                validation,
            });
        }
    }
    out
}

fn bootstrap(
    n: usize,
    k: usize,
    strata: &[Vec<usize>],
    rng: &mut StdRng,
) -> Result<Vec<Partition>, RaceError> {
    let mut out = Vec::with_capacity(k);
    for b in 0..k {
        let mut drawn = None;
        for _ in 0..MAX_REDRAWS {
            let mut in_bag = vec![false; n];
            let mut train = Vec::with_capacity(n);
            for stratum in strata {
                for _ in 0..stratum.len() {
                    let row = stratum[rng.gen_range(0..stratum.len())];
                    in_bag[row] = true;
                    train.push(row);
                }
            }
            let validation: Vec<usize> = (0..n).filter(|&row| !in_bag[row]).collect();
            if !validation.is_empty() {
                drawn = Some((train, validation));
                break;
            }
        }
        let Some((train, validation)) = drawn else {
            return Err(RaceError::invalid(format!(
                "Bootstrap {} left no out-of-bag rows after {MAX_REDRAWS} draws; the dataset is too small.",
                b + 1
            )));
        };
        out.push(Partition {
            id: PartitionId(b),
            label: format!("Bootstrap{:02}", b + 1),
            train,
            validation,
        });
    }
    Ok(out)
}

/// Row groups for stratified sampling, or a single group when strata are too
/// small to be useful.
fn strata_for(dataset: &Dataset) -> Vec<Vec<usize>> {
    let y = dataset.targets();
    let n = y.len();
    let key: Vec<usize> = match dataset.task() {
        TaskKind::Classification => y.iter().map(|v| usize::from(*v >= 0.5)).collect(),
        TaskKind::Regression => {
            let mut sorted = y.to_vec();
            sorted.sort_by(f64::total_cmp);
            let cut = |q: f64| sorted[((n - 1) as f64 * q).round() as usize];
            let cuts = [cut(0.25), cut(0.5), cut(0.75)];
            y.iter()
                .map(|v| cuts.iter().filter(|c| v > c).count())
                .collect()
        }
    };

    let groups = key.iter().copied().max().map_or(0, |m| m + 1);
    let mut strata = vec![Vec::new(); groups];
    for (row, &g) in key.iter().enumerate() {
        strata[g].push(row);
    }
    strata.retain(|s| !s.is_empty());

    if strata.iter().any(|s| s.len() < MIN_STRATUM) {
        tracing::debug!("stratum below {MIN_STRATUM} rows; sampling unstratified");
        return vec![(0..n).collect()];
    }
    strata
}
