//! Synthetic minority oversampling
//!
//! Raises under-represented classes toward a per-class target count by
//! interpolating between same-class neighbors. Every synthetic point is a
//! convex combination of two existing points of the same class, so the
//! generated data never leaves the class's feature envelope. Applied only
//! to the training partition, only after scaling; existing samples are
//! never modified and majority classes are never down-sampled.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::{FeatureVector, NUM_FEATURES};

/// Oversampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Per-class sample target; classes at or above it are left untouched
    pub target_count: usize,
    /// Neighbors considered per synthetic point (capped at class size - 1)
    pub k_neighbors: usize,
    /// RNG seed
    pub seed: u64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            target_count: 10_000,
            k_neighbors: 5,
            seed: 42,
        }
    }
}

/// Oversample minority classes up to the configured target.
///
/// Returns the input rows followed by the synthetic rows; input order is
/// preserved and input values are untouched.
pub fn oversample(
    x: &[FeatureVector],
    y: &[usize],
    config: &ResampleConfig,
) -> (Vec<FeatureVector>, Vec<usize>) {
    assert_eq!(x.len(), y.len(), "features and labels must align");

    let mut out_x = x.to_vec();
    let mut out_y = y.to_vec();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }

    for (class, members) in groups {
        if members.is_empty() || members.len() >= config.target_count {
            continue;
        }

        let need = config.target_count - members.len();
        let k = config.k_neighbors.min(members.len() - 1);
        let neighbors = if k > 0 {
            neighbor_table(x, &members, k)
        } else {
            Vec::new()
        };

        for _ in 0..need {
            let pos = rng.random_range(0..members.len());
            let base = &x[members[pos]];

            let synth = if k == 0 {
                // Singleton class: replicate the lone point
                base.clone()
            } else {
                let neighbor_pos = neighbors[pos][rng.random_range(0..k)];
                let gap: f32 = rng.random();
                interpolate(base, &x[members[neighbor_pos]], gap)
            };

            out_x.push(synth);
            out_y.push(class);
        }

        debug!(
            "Oversampled class {}: {} -> {} samples",
            class,
            members.len(),
            config.target_count
        );
    }

    (out_x, out_y)
}

/// k nearest same-class neighbors (by position within `members`) for each
/// member, by squared Euclidean distance.
fn neighbor_table(x: &[FeatureVector], members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .enumerate()
        .map(|(pos, &idx)| {
            let mut ranked: Vec<(f32, usize)> = members
                .iter()
                .enumerate()
                .filter(|&(other_pos, _)| other_pos != pos)
                .map(|(other_pos, &other_idx)| (squared_distance(&x[idx], &x[other_idx]), other_pos))
                .collect();

            ranked.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            ranked.truncate(k);
            ranked.into_iter().map(|(_, other_pos)| other_pos).collect()
        })
        .collect()
}

fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f32 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(av, bv)| (av - bv) * (av - bv))
        .sum()
}

fn interpolate(a: &FeatureVector, b: &FeatureVector, gap: f32) -> FeatureVector {
    let mut values = [0.0f32; NUM_FEATURES];
    for (i, v) in values.iter_mut().enumerate() {
        let av = a.as_slice()[i];
        let bv = b.as_slice()[i];
        *v = av + gap * (bv - av);
    }
    FeatureVector(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(class: usize, count: usize, center: f32) -> (Vec<FeatureVector>, Vec<usize>) {
        let mut x = Vec::with_capacity(count);
        let mut y = Vec::with_capacity(count);
        for i in 0..count {
            let jitter = (i % 10) as f32 * 0.001;
            x.push(FeatureVector([center + jitter; NUM_FEATURES]));
            y.push(class);
        }
        (x, y)
    }

    fn build(counts: &[(usize, usize, f32)]) -> (Vec<FeatureVector>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for &(class, count, center) in counts {
            let (cx, cy) = cluster(class, count, center);
            x.extend(cx);
            y.extend(cy);
        }
        (x, y)
    }

    fn class_count(y: &[usize], class: usize) -> usize {
        y.iter().filter(|&&c| c == class).count()
    }

    #[test]
    fn test_minorities_raised_majority_untouched() {
        // The canonical skew scenario: {A: 50, B: 9000, C: 3}, target 1000
        let (x, y) = build(&[(0, 50, 0.1), (1, 9000, 0.5), (2, 3, 0.9)]);
        let config = ResampleConfig {
            target_count: 1000,
            ..Default::default()
        };

        let (out_x, out_y) = oversample(&x, &y, &config);

        assert_eq!(class_count(&out_y, 0), 1000);
        assert_eq!(class_count(&out_y, 1), 9000);
        assert_eq!(class_count(&out_y, 2), 1000);
        assert_eq!(out_x.len(), out_y.len());
    }

    #[test]
    fn test_existing_samples_unchanged() {
        let (x, y) = build(&[(0, 20, 0.2), (1, 5, 0.8)]);
        let config = ResampleConfig {
            target_count: 30,
            ..Default::default()
        };

        let (out_x, out_y) = oversample(&x, &y, &config);

        assert_eq!(&out_x[..x.len()], &x[..]);
        assert_eq!(&out_y[..y.len()], &y[..]);
    }

    #[test]
    fn test_synthetics_stay_inside_class_envelope() {
        let (x, y) = build(&[(0, 200, 0.5), (1, 8, 0.3)]);
        let config = ResampleConfig {
            target_count: 100,
            ..Default::default()
        };

        let (out_x, out_y) = oversample(&x, &y, &config);

        // Class 1 envelope per feature
        let members: Vec<&FeatureVector> =
            x.iter().zip(&y).filter(|(_, &c)| c == 1).map(|(f, _)| f).collect();
        for i in 0..NUM_FEATURES {
            let lo = members.iter().map(|f| f.as_slice()[i]).fold(f32::MAX, f32::min);
            let hi = members.iter().map(|f| f.as_slice()[i]).fold(f32::MIN, f32::max);

            for (f, &c) in out_x[x.len()..].iter().zip(&out_y[y.len()..]) {
                if c == 1 {
                    let v = f.as_slice()[i];
                    assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "{} outside [{}, {}]", v, lo, hi);
                }
            }
        }
    }

    #[test]
    fn test_singleton_class_is_replicated() {
        let (x, y) = build(&[(0, 40, 0.4), (1, 1, 0.9)]);
        let config = ResampleConfig {
            target_count: 10,
            ..Default::default()
        };

        let (out_x, out_y) = oversample(&x, &y, &config);

        assert_eq!(class_count(&out_y, 1), 10);
        for (f, &c) in out_x.iter().zip(&out_y) {
            if c == 1 {
                assert_eq!(f, &x[40]);
            }
        }
    }

    #[test]
    fn test_deterministic_under_seed() {
        let (x, y) = build(&[(0, 30, 0.2), (1, 6, 0.7)]);
        let config = ResampleConfig {
            target_count: 50,
            ..Default::default()
        };

        let (a_x, a_y) = oversample(&x, &y, &config);
        let (b_x, b_y) = oversample(&x, &y, &config);

        assert_eq!(a_x, b_x);
        assert_eq!(a_y, b_y);
    }
}
