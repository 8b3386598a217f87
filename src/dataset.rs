//! Dataset preparation
//!
//! Loads a labeled flow dataset from CSV and produces aligned
//! (feature, label) rows: leakage-prone identifier columns are stripped,
//! only the contracted features are kept (in contract order), rows with
//! missing or non-finite values are dropped together with their labels,
//! and rare classes are collapsed into a single bucket before encoding.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DatasetError;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::labels::LabelEncoder;

/// Dataset preparation configuration.
///
/// The candidate and leak lists are heuristics tuned to flow datasets in
/// the CICIDS family; they are configuration data, not built-in behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Ordered label-column candidates; first exact header match wins.
    pub label_candidates: Vec<String>,
    /// Identifier/address/timestamp columns that must never reach the model.
    pub leak_columns: Vec<String>,
    /// Class names too rare to train or evaluate on their own.
    pub rare_classes: Vec<String>,
    /// Bucket the rare classes are collapsed into.
    pub rare_bucket: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            label_candidates: [
                "Label", "label", "LABEL", "class", "Class", "CLASS", "target", "Target",
                "TARGET",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            leak_columns: [
                "src_ip",
                "dst_ip",
                "src_mac",
                "dst_mac",
                "flow_id",
                "id",
                "timestamp",
                "start_time",
                "end_time",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rare_classes: vec!["Heartbleed".to_string(), "Infiltration".to_string()],
            rare_bucket: "RareAttack".to_string(),
        }
    }
}

/// Prepared dataset: features and encoded labels aligned by position.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<usize>,
    pub encoder: LabelEncoder,
    /// Which column supplied the labels
    pub label_column: String,
    /// Rows read from the file, before cleaning
    pub rows_read: usize,
    /// Rows dropped for missing/non-finite values
    pub rows_dropped: usize,
}

impl Dataset {
    /// Load and prepare a labeled CSV dataset.
    pub fn load_csv(path: &Path, config: &DatasetConfig) -> Result<Self, DatasetError> {
        // A contract feature marked leaky is a configuration contradiction:
        // it can be neither kept nor dropped.
        for name in FEATURE_NAMES {
            if config.leak_columns.iter().any(|l| l.eq_ignore_ascii_case(name)) {
                return Err(DatasetError::ContractColumnLeaky(name.to_string()));
            }
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        info!("Loaded dataset {:?}: {} columns", path, headers.len());

        let (label_idx, label_column) = detect_label_column(&headers, &config.label_candidates);

        let present_leaks: Vec<&String> = headers
            .iter()
            .filter(|h| config.leak_columns.iter().any(|l| l.eq_ignore_ascii_case(h)))
            .collect();
        if !present_leaks.is_empty() {
            info!("Stripping {} leak-prone columns: {:?}", present_leaks.len(), present_leaks);
        }

        // Column index per contract feature. Projection through this map is
        // what keeps leak columns out of the feature space.
        let mut feature_cols = [0usize; FEATURE_NAMES.len()];
        for (i, &name) in FEATURE_NAMES.iter().enumerate() {
            feature_cols[i] = headers
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }

        let mut features = Vec::new();
        let mut raw_labels: Vec<String> = Vec::new();
        let mut rows_read = 0usize;
        let mut rows_dropped = 0usize;

        for result in reader.records() {
            let record = result?;
            rows_read += 1;

            let label = match record.get(label_idx) {
                Some(l) if !l.trim().is_empty() => l.trim().to_string(),
                _ => {
                    rows_dropped += 1;
                    continue;
                }
            };

            let projected = FeatureVector::from_lookup(|name| {
                let idx = FEATURE_NAMES.iter().position(|&n| n == name)?;
                record
                    .get(feature_cols[idx])
                    .and_then(|s| s.trim().parse::<f32>().ok())
            });

            match projected {
                Ok(fv) => {
                    features.push(fv);
                    raw_labels.push(remap_rare(label, config));
                }
                Err(e) => {
                    debug!("Dropping row {}: {}", rows_read, e);
                    rows_dropped += 1;
                }
            }
        }

        if features.is_empty() {
            return Err(DatasetError::Empty);
        }

        let encoder = LabelEncoder::fit(&raw_labels);
        let labels = encoder.transform(&raw_labels)?;

        let dataset = Self {
            features,
            labels,
            encoder,
            label_column,
            rows_read,
            rows_dropped,
        };

        info!(
            "Prepared {} rows ({} dropped), {} classes: {:?}",
            dataset.features.len(),
            dataset.rows_dropped,
            dataset.encoder.len(),
            dataset.encoder.classes()
        );

        Ok(dataset)
    }

    /// Number of usable rows.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the dataset holds no rows.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sample count per encoded class.
    pub fn class_distribution(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

/// Walk the candidate list; fall back to the last column when nothing
/// matches. The fallback is best-effort and logged as low confidence.
fn detect_label_column(headers: &[String], candidates: &[String]) -> (usize, String) {
    for candidate in candidates {
        if let Some(idx) = headers.iter().position(|h| h == candidate) {
            info!("Label column detected: {}", candidate);
            return (idx, candidate.clone());
        }
    }

    let idx = headers.len().saturating_sub(1);
    let name = headers.get(idx).cloned().unwrap_or_default();
    warn!(
        "No label candidate matched; falling back to last column '{}' (low confidence)",
        name
    );
    (idx, name)
}

fn remap_rare(label: String, config: &DatasetConfig) -> String {
    if config.rare_classes.iter().any(|r| r == &label) {
        config.rare_bucket.clone()
    } else {
        label
    }
}
