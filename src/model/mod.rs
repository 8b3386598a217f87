//! Multi-class gradient boosting
//!
//! Boosted regression trees over one-hot class targets: one boosting
//! chain per class, squared-error residuals, row and feature subsampling
//! per round, argmax decode. Small and dependency-free by design; the
//! whole model serializes with serde for artifact persistence.

mod tree;

pub use tree::RegressionTree;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, NUM_FEATURES};
use tree::{next_lcg, TreeParams};

/// Boosting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostConfig {
    /// Boosting rounds per class chain
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f32,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Row subsample ratio per round
    pub subsample: f32,
    /// Features considered per node
    pub max_features: usize,
    /// Seed for the subsampling PRNG
    pub seed: u64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 10,
            subsample: 0.8,
            max_features: NUM_FEATURES,
            seed: 42,
        }
    }
}

/// One class's boosting chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassChain {
    base_score: f32,
    trees: Vec<RegressionTree>,
}

impl ClassChain {
    fn score(&self, sample: &FeatureVector, learning_rate: f32) -> f32 {
        let mut score = self.base_score;
        for tree in &self.trees {
            score += learning_rate * tree.predict(sample);
        }
        score
    }
}

/// Multi-class gradient-boosted tree classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostClassifier {
    config: BoostConfig,
    chains: Vec<ClassChain>,
    feature_importance: [f32; NUM_FEATURES],
    trained: bool,
}

impl GradientBoostClassifier {
    /// Create an untrained classifier.
    pub fn new(config: BoostConfig) -> Self {
        Self {
            config,
            chains: Vec::new(),
            feature_importance: [0.0; NUM_FEATURES],
            trained: false,
        }
    }

    /// Fit on encoded labels in `0..n_classes`.
    pub fn fit(&mut self, x: &[FeatureVector], y: &[usize], n_classes: usize) {
        if x.is_empty() || x.len() != y.len() || n_classes == 0 {
            return;
        }

        self.chains.clear();
        self.feature_importance = [0.0; NUM_FEATURES];

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            max_features: self.config.max_features.clamp(1, NUM_FEATURES),
        };

        for class in 0..n_classes {
            let targets: Vec<f32> = y.iter().map(|&c| if c == class { 1.0 } else { 0.0 }).collect();
            let base_score = mean(&targets);
            let mut predictions = vec![base_score; x.len()];
            let mut trees = Vec::with_capacity(self.config.n_estimators);

            for round in 0..self.config.n_estimators {
                let residuals: Vec<f32> = targets
                    .iter()
                    .zip(&predictions)
                    .map(|(t, p)| t - p)
                    .collect();

                let mut lcg = self
                    .config
                    .seed
                    .wrapping_add((class * self.config.n_estimators + round) as u64);

                // next_lcg yields 31 bits, so scale by 2^31 for a [0, 1) ratio
                let mut idxs: Vec<usize> = (0..x.len())
                    .filter(|_| {
                        (next_lcg(&mut lcg) as f32 / (1u64 << 31) as f32) < self.config.subsample
                    })
                    .collect();
                if idxs.is_empty() {
                    idxs = (0..x.len()).collect();
                }

                let tree = RegressionTree::fit(
                    x,
                    &residuals,
                    &idxs,
                    &params,
                    &mut lcg,
                    &mut self.feature_importance,
                );

                for (i, sample) in x.iter().enumerate() {
                    predictions[i] += self.config.learning_rate * tree.predict(sample);
                }

                trees.push(tree);
            }

            self.chains.push(ClassChain { base_score, trees });
        }

        self.trained = true;
    }

    /// Per-class scores for a sample, in class-code order.
    pub fn scores(&self, sample: &FeatureVector) -> Vec<f32> {
        self.chains
            .iter()
            .map(|chain| chain.score(sample, self.config.learning_rate))
            .collect()
    }

    /// Predict the class code with the highest score.
    pub fn predict(&self, sample: &FeatureVector) -> usize {
        self.scores(sample)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Predict a batch of samples.
    pub fn predict_batch(&self, rows: &[FeatureVector]) -> Vec<usize> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    /// Number of classes the model was fit for.
    pub fn n_classes(&self) -> usize {
        self.chains.len()
    }

    /// Accumulated split gain per feature index.
    pub fn feature_importance(&self) -> &[f32; NUM_FEATURES] {
        &self.feature_importance
    }

    /// Top `n` features by accumulated split gain.
    pub fn top_features(&self, n: usize) -> Vec<(usize, f32)> {
        let mut indexed: Vec<(usize, f32)> = self
            .feature_importance
            .iter()
            .enumerate()
            .map(|(i, &v)| (i, v))
            .collect();

        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed.truncate(n);
        indexed
    }

    /// Whether `fit` has completed.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// The configuration this model was built with.
    pub fn config(&self) -> &BoostConfig {
        &self.config
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
