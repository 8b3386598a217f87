//! Regression trees fit to boosting residuals.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, NUM_FEATURES};

/// Per-tree parameters carried over from the boosting configuration.
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

/// Advance the split-sampling PRNG state.
pub(crate) fn next_lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state >> 33
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f32,
    },
    Split {
        feature_idx: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A depth-limited regression tree minimizing squared error on residuals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Fit a tree on the rows selected by `idxs`.
    ///
    /// Split gains are accumulated into `importance` per feature.
    pub(crate) fn fit(
        x: &[FeatureVector],
        residuals: &[f32],
        idxs: &[usize],
        params: &TreeParams,
        lcg: &mut u64,
        importance: &mut [f32; NUM_FEATURES],
    ) -> Self {
        Self {
            root: build_node(x, residuals, idxs, 0, params, lcg, importance),
        }
    }

    /// Predict the residual correction for a single sample.
    pub fn predict(&self, sample: &FeatureVector) -> f32 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample.as_slice()[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_node(
    x: &[FeatureVector],
    residuals: &[f32],
    idxs: &[usize],
    depth: usize,
    params: &TreeParams,
    lcg: &mut u64,
    importance: &mut [f32; NUM_FEATURES],
) -> Node {
    if depth >= params.max_depth || idxs.len() < params.min_samples_split {
        return Node::Leaf {
            value: mean_of(residuals, idxs),
        };
    }

    // Feature subsampling per node
    let mut candidates: Vec<usize> = (0..NUM_FEATURES)
        .filter(|_| next_lcg(lcg) as usize % NUM_FEATURES < params.max_features)
        .take(params.max_features)
        .collect();
    if candidates.is_empty() {
        candidates = (0..NUM_FEATURES).collect();
    }

    let total_var = variance_of(residuals, idxs);
    let mut best_gain = 0.0f32;
    let mut best: Option<(usize, f32, Vec<usize>, Vec<usize>)> = None;

    for feature_idx in candidates {
        let mut values: Vec<f32> = idxs.iter().map(|&i| x[i].as_slice()[feature_idx]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }

        // Every unique value except the largest keeps both sides non-empty
        for &threshold in &values[..values.len() - 1] {
            let (left, right): (Vec<usize>, Vec<usize>) = idxs
                .iter()
                .copied()
                .partition(|&i| x[i].as_slice()[feature_idx] <= threshold);

            let left_weight = left.len() as f32 / idxs.len() as f32;
            let right_weight = right.len() as f32 / idxs.len() as f32;
            let gain = total_var
                - (left_weight * variance_of(residuals, &left)
                    + right_weight * variance_of(residuals, &right));

            if gain > best_gain {
                best_gain = gain;
                best = Some((feature_idx, threshold, left, right));
            }
        }
    }

    match best {
        Some((feature_idx, threshold, left, right)) => {
            importance[feature_idx] += best_gain;
            Node::Split {
                feature_idx,
                threshold,
                left: Box::new(build_node(x, residuals, &left, depth + 1, params, lcg, importance)),
                right: Box::new(build_node(x, residuals, &right, depth + 1, params, lcg, importance)),
            }
        }
        None => Node::Leaf {
            value: mean_of(residuals, idxs),
        },
    }
}

fn mean_of(values: &[f32], idxs: &[usize]) -> f32 {
    if idxs.is_empty() {
        return 0.0;
    }
    idxs.iter().map(|&i| values[i]).sum::<f32>() / idxs.len() as f32
}

fn variance_of(values: &[f32], idxs: &[usize]) -> f32 {
    if idxs.len() < 2 {
        return 0.0;
    }
    let m = mean_of(values, idxs);
    idxs.iter().map(|&i| (values[i] - m).powi(2)).sum::<f32>() / idxs.len() as f32
}
