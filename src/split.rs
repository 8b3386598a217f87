//! Stratified partitioning
//!
//! Train/test splitting and k-fold assignment that preserve per-class
//! proportions. Splitting runs before scaling and resampling, so nothing
//! about the test partition (not even its feature ranges) can leak into
//! the fitted preprocessing state.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Split configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each class held out for testing
    pub test_fraction: f32,
    /// RNG seed; the same seed reproduces the same split
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// A materialized train/test partition.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train_x: Vec<FeatureVector>,
    pub train_y: Vec<usize>,
    pub test_x: Vec<FeatureVector>,
    pub test_y: Vec<usize>,
}

/// Stratified train/test split.
///
/// Each class is shuffled independently and contributes a proportional
/// share to the test partition. Classes with at least two members always
/// keep at least one row in training.
pub fn stratified_split(x: &[FeatureVector], y: &[usize], config: &SplitConfig) -> TrainTestSplit {
    assert_eq!(x.len(), y.len(), "features and labels must align");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for (_, mut members) in group_by_class(y) {
        members.shuffle(&mut rng);

        let mut n_test = (members.len() as f32 * config.test_fraction).round() as usize;
        n_test = n_test.min(members.len().saturating_sub(1));

        test_idx.extend_from_slice(&members[..n_test]);
        train_idx.extend_from_slice(&members[n_test..]);
    }

    TrainTestSplit {
        train_x: train_idx.iter().map(|&i| x[i].clone()).collect(),
        train_y: train_idx.iter().map(|&i| y[i]).collect(),
        test_x: test_idx.iter().map(|&i| x[i].clone()).collect(),
        test_y: test_idx.iter().map(|&i| y[i]).collect(),
    }
}

/// Stratified k-fold assignment over label codes.
///
/// Returns `(train_indices, test_indices)` per fold. Members of each class
/// are shuffled once and dealt round-robin, so every fold sees roughly the
/// class proportions of the whole set.
pub fn stratified_kfold(y: &[usize], k: usize, seed: u64) -> Vec<(Vec<usize>, Vec<usize>)> {
    assert!(k >= 2, "k-fold needs at least two folds");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; y.len()];

    for (_, mut members) in group_by_class(y) {
        members.shuffle(&mut rng);
        for (i, idx) in members.into_iter().enumerate() {
            fold_of[idx] = i % k;
        }
    }

    (0..k)
        .map(|fold| {
            let mut train = Vec::new();
            let mut test = Vec::new();
            for (idx, &assigned) in fold_of.iter().enumerate() {
                if assigned == fold {
                    test.push(idx);
                } else {
                    train.push(idx);
                }
            }
            (train, test)
        })
        .collect()
}

fn group_by_class(y: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::NUM_FEATURES;

    fn make_data(counts: &[(usize, usize)]) -> (Vec<FeatureVector>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for &(class, count) in counts {
            for i in 0..count {
                x.push(FeatureVector([i as f32; NUM_FEATURES]));
                y.push(class);
            }
        }
        (x, y)
    }

    #[test]
    fn test_split_preserves_class_proportions() {
        let (x, y) = make_data(&[(0, 100), (1, 20), (2, 10)]);
        let split = stratified_split(&x, &y, &SplitConfig::default());

        let test_count = |class: usize| split.test_y.iter().filter(|&&c| c == class).count();
        assert_eq!(test_count(0), 20);
        assert_eq!(test_count(1), 4);
        assert_eq!(test_count(2), 2);

        assert_eq!(split.train_x.len() + split.test_x.len(), 130);
        assert_eq!(split.train_x.len(), split.train_y.len());
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = make_data(&[(0, 50), (1, 15)]);
        let config = SplitConfig::default();

        let a = stratified_split(&x, &y, &config);
        let b = stratified_split(&x, &y, &config);

        assert_eq!(a.train_y, b.train_y);
        assert_eq!(a.test_y, b.test_y);
        assert_eq!(a.train_x, b.train_x);
    }

    #[test]
    fn test_tiny_class_keeps_a_training_row() {
        let (x, y) = make_data(&[(0, 20), (1, 2)]);
        let config = SplitConfig {
            test_fraction: 0.5,
            seed: 7,
        };
        let split = stratified_split(&x, &y, &config);

        assert!(split.train_y.iter().any(|&c| c == 1));
    }

    #[test]
    fn test_kfold_covers_every_index_once() {
        let (_, y) = make_data(&[(0, 23), (1, 12)]);
        let folds = stratified_kfold(&y, 5, 42);

        assert_eq!(folds.len(), 5);
        let mut seen = vec![0usize; y.len()];
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), y.len());
            for &idx in test {
                seen[idx] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }
}
