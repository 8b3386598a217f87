//! Training pipeline orchestration
//!
//! Runs the whole offline protocol in leakage-safe order: stratified
//! split first, scaler fit on the training partition only, synthetic
//! oversampling of the scaled training partition, model fit, held-out
//! evaluation, cross-validated weighted F1 as a generalization
//! diagnostic, and a label-shuffle sanity check that flags pipelines
//! which learn something they should not.

use std::collections::BTreeMap;

use chrono::Utc;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{generation_fingerprint, host_id, ArtifactMetadata, ArtifactSet};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::metrics::{evaluate, weighted_f1, EvalReport};
use crate::model::GradientBoostClassifier;
use crate::resample::oversample;
use crate::scaler::MinMaxScaler;
use crate::split::{stratified_kfold, stratified_split};

/// Trainer-specific knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Folds for the cross-validation diagnostic
    pub cv_folds: usize,
    /// Run the label-shuffle sanity check
    pub sanity_check: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            sanity_check: true,
        }
    }
}

/// Everything a training run produces.
#[derive(Debug)]
pub struct TrainOutcome {
    pub artifacts: ArtifactSet,
    pub report: EvalReport,
    pub cv_scores: Vec<f32>,
    /// Weighted F1 of the shuffled-label control model, when enabled
    pub shuffled_f1: Option<f32>,
}

/// Offline training pipeline.
pub struct Trainer {
    config: Config,
}

impl Trainer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full protocol against a prepared dataset.
    pub fn run(&self, dataset: &Dataset) -> anyhow::Result<TrainOutcome> {
        let n_classes = dataset.encoder.len();
        anyhow::ensure!(n_classes >= 2, "need at least two classes to train");
        anyhow::ensure!(
            self.config.trainer.cv_folds >= 2,
            "cross-validation needs at least two folds"
        );

        let counts_by_name = self.counts_by_name(dataset);
        info!("Class distribution: {:?}", counts_by_name);

        // Split before any fitted preprocessing
        let split = stratified_split(&dataset.features, &dataset.labels, &self.config.split);
        info!(
            "Stratified split: {} train / {} test rows (test fraction {})",
            split.train_x.len(),
            split.test_x.len(),
            self.config.split.test_fraction
        );

        let scaler = MinMaxScaler::fit(&split.train_x);
        let train_scaled = scaler.transform_batch(&split.train_x);
        let test_scaled = scaler.transform_batch(&split.test_x);

        let (resampled_x, resampled_y) =
            oversample(&train_scaled, &split.train_y, &self.config.resample);
        info!(
            "Oversampled training set: {} -> {} rows (target {} per class)",
            train_scaled.len(),
            resampled_x.len(),
            self.config.resample.target_count
        );

        let mut model = GradientBoostClassifier::new(self.config.model.clone());
        model.fit(&resampled_x, &resampled_y, n_classes);
        info!(
            "Fit gradient-boosted model: {} classes x {} rounds",
            n_classes, self.config.model.n_estimators
        );

        let predictions = model.predict_batch(&test_scaled);
        let report = evaluate(&split.test_y, &predictions, dataset.encoder.classes());
        println!("\nClassification report (held-out test set):");
        println!("{}", report.render());
        println!("\n{}", report.render_confusion());

        let top: Vec<String> = model
            .top_features(5)
            .into_iter()
            .filter(|(_, gain)| *gain > 0.0)
            .map(|(idx, gain)| format!("{} ({:.3})", FEATURE_NAMES[idx], gain))
            .collect();
        info!("Top features by split gain: {}", top.join(", "));

        // Diagnostic only; the persisted model is the one fit above
        let all_scaled = scaler.transform_batch(&dataset.features);
        let cv_scores = self.cross_validate(&all_scaled, &dataset.labels, n_classes);
        let cv_mean = cv_scores.iter().sum::<f32>() / cv_scores.len().max(1) as f32;
        info!(
            "Cross-validated weighted F1 ({} folds): {:?}, mean {:.4}",
            self.config.trainer.cv_folds, cv_scores, cv_mean
        );

        let shuffled_f1 = if self.config.trainer.sanity_check {
            Some(self.sanity_check(dataset, n_classes, report.weighted_f1))
        } else {
            None
        };

        let generation = generation_fingerprint(&counts_by_name, dataset.len());
        let metadata = ArtifactMetadata {
            generation: generation.clone(),
            trained_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            train_rows: split.train_x.len(),
            test_rows: split.test_x.len(),
            classes: dataset.encoder.classes().to_vec(),
            host_id: host_id(),
        };

        Ok(TrainOutcome {
            artifacts: ArtifactSet {
                generation,
                metadata,
                model,
                scaler,
                encoder: dataset.encoder.clone(),
            },
            report,
            cv_scores,
            shuffled_f1,
        })
    }

    fn counts_by_name(&self, dataset: &Dataset) -> BTreeMap<String, usize> {
        dataset
            .class_distribution()
            .into_iter()
            .map(|(code, count)| {
                let name = dataset.encoder.decode(code).unwrap_or("?").to_string();
                (name, count)
            })
            .collect()
    }

    /// Stratified k-fold weighted F1 over the entire scaled dataset.
    fn cross_validate(&self, x: &[FeatureVector], y: &[usize], n_classes: usize) -> Vec<f32> {
        stratified_kfold(y, self.config.trainer.cv_folds, self.config.split.seed)
            .into_iter()
            .map(|(train, test)| {
                let train_x: Vec<FeatureVector> = train.iter().map(|&i| x[i].clone()).collect();
                let train_y: Vec<usize> = train.iter().map(|&i| y[i]).collect();
                let test_x: Vec<FeatureVector> = test.iter().map(|&i| x[i].clone()).collect();
                let test_y: Vec<usize> = test.iter().map(|&i| y[i]).collect();

                let mut model = GradientBoostClassifier::new(self.config.model.clone());
                model.fit(&train_x, &train_y, n_classes);
                weighted_f1(&test_y, &model.predict_batch(&test_x), n_classes)
            })
            .collect()
    }

    /// Retrain an identical model on shuffled labels.
    ///
    /// Near-chance performance is the healthy outcome. A control model
    /// that still scores well means some feature carries label or
    /// row-order information, which must be investigated by a human;
    /// this never aborts the run.
    fn sanity_check(&self, dataset: &Dataset, n_classes: usize, true_f1: f32) -> f32 {
        let mut shuffled = dataset.labels.clone();
        let mut rng = StdRng::seed_from_u64(self.config.split.seed ^ 0x5eed);
        shuffled.shuffle(&mut rng);

        let split = stratified_split(&dataset.features, &shuffled, &self.config.split);
        let scaler = MinMaxScaler::fit(&split.train_x);
        let train_scaled = scaler.transform_batch(&split.train_x);
        let test_scaled = scaler.transform_batch(&split.test_x);

        let mut control = GradientBoostClassifier::new(self.config.model.clone());
        control.fit(&train_scaled, &split.train_y, n_classes);

        let f1 = weighted_f1(&split.test_y, &control.predict_batch(&test_scaled), n_classes);
        let chance = 1.0 / n_classes as f32;
        let loud_threshold = (2.0 * chance).max(0.5 * true_f1);

        if f1 > loud_threshold {
            let banner = format!(
                "LEAKAGE SIGNAL: shuffled-label model scored weighted F1 {:.4} \
(chance ~{:.4}, true labels {:.4})",
                f1, chance, true_f1
            );
            println!("\n{}", banner.red().bold());
            warn!("{} - investigate the feature pipeline before trusting this model", banner);
        } else {
            info!(
                "Sanity check passed: shuffled-label weighted F1 {:.4} (chance ~{:.4})",
                f1, chance
            );
        }

        f1
    }
}
