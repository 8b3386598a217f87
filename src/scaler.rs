//! Min-max feature scaling
//!
//! Fit once on the training partition, apply everywhere else: test rows
//! and every live flow go through the same fitted state. Fitting on test
//! or live statistics is a leakage bug, not a supported mode.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, NUM_FEATURES};

/// Fitted per-feature min/max bounds. Immutable once fit; `transform`
/// never updates the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: [f32; NUM_FEATURES],
    max: [f32; NUM_FEATURES],
}

impl MinMaxScaler {
    /// Fit bounds from training rows.
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut min = [f32::MAX; NUM_FEATURES];
        let mut max = [f32::MIN; NUM_FEATURES];

        for row in rows {
            for (i, &v) in row.as_slice().iter().enumerate() {
                if v < min[i] {
                    min[i] = v;
                }
                if v > max[i] {
                    max[i] = v;
                }
            }
        }

        if rows.is_empty() {
            min = [0.0; NUM_FEATURES];
            max = [0.0; NUM_FEATURES];
        }

        Self { min, max }
    }

    /// Scale one vector into [0, 1] per feature. A degenerate feature
    /// (max == min in the training partition) maps to 0.0.
    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0f32; NUM_FEATURES];
        for (i, &v) in row.as_slice().iter().enumerate() {
            let range = self.max[i] - self.min[i];
            out[i] = if range > 0.0 { (v - self.min[i]) / range } else { 0.0 };
        }
        FeatureVector(out)
    }

    /// Scale a batch of rows.
    pub fn transform_batch(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    /// Fitted bounds for a feature index.
    pub fn bounds(&self, index: usize) -> (f32, f32) {
        (self.min[index], self.max[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_with(first: f32, rest: f32) -> FeatureVector {
        let mut values = [rest; NUM_FEATURES];
        values[0] = first;
        FeatureVector(values)
    }

    #[test]
    fn test_fit_transform_lands_in_unit_range() {
        let rows = vec![vec_with(0.0, 10.0), vec_with(50.0, 20.0), vec_with(100.0, 30.0)];
        let scaler = MinMaxScaler::fit(&rows);

        for row in &rows {
            let scaled = scaler.transform(row);
            for &v in scaled.as_slice() {
                assert!((0.0..=1.0).contains(&v), "value {} out of range", v);
            }
        }

        let mid = scaler.transform(&rows[1]);
        assert!((mid.as_slice()[0] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_feature_maps_to_zero() {
        // Every feature constant across the partition
        let rows = vec![vec_with(5.0, 1.0), vec_with(5.0, 1.0)];
        let scaler = MinMaxScaler::fit(&rows);

        let scaled = scaler.transform(&rows[0]);
        assert!(scaled.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_row_matches_batch() {
        let rows = vec![vec_with(1.0, 2.0), vec_with(9.0, 4.0)];
        let scaler = MinMaxScaler::fit(&rows);

        let single = scaler.transform(&rows[1]);
        let batch = scaler.transform_batch(&rows);
        assert_eq!(single, batch[1]);
    }

    #[test]
    fn test_transform_does_not_mutate_state() {
        let rows = vec![vec_with(0.0, 0.0), vec_with(10.0, 10.0)];
        let scaler = MinMaxScaler::fit(&rows);
        let before = scaler.clone();

        // Out-of-range value from a "future" flow
        scaler.transform(&vec_with(500.0, -3.0));
        assert_eq!(scaler, before);
    }
}
