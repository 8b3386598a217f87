//! Model artifact persistence
//!
//! The only state shared between the offline trainer and the live scorer:
//! classifier, scaler state and label table, persisted as one generation.
//! Every file carries the generation fingerprint; loading verifies all
//! three agree, so a scorer can never silently mix a stale scaler with a
//! fresh model.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::ArtifactError;
use crate::features::FEATURE_NAMES;
use crate::labels::LabelEncoder;
use crate::model::GradientBoostClassifier;
use crate::scaler::MinMaxScaler;

pub const MODEL_FILE: &str = "model.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const LABELS_FILE: &str = "labels.bin";
pub const METADATA_FILE: &str = "metadata.json";

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding one artifact generation
    pub dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

/// Metadata sidecar for a persisted generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub generation: String,
    pub trained_at: DateTime<Utc>,
    pub version: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classes: Vec<String>,
    pub host_id: String,
}

/// One consistent set of trained artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub generation: String,
    pub metadata: ArtifactMetadata,
    pub model: GradientBoostClassifier,
    pub scaler: MinMaxScaler,
    pub encoder: LabelEncoder,
}

/// Payload wrapper binding every artifact file to its generation.
#[derive(Serialize, Deserialize)]
struct Sealed<T> {
    generation: String,
    payload: T,
}

/// Fingerprint of the feature contract plus the training data shape.
///
/// Any change to the contract, the row count or the class distribution
/// produces a new generation.
pub fn generation_fingerprint(class_counts: &BTreeMap<String, usize>, rows: usize) -> String {
    let mut hasher = Sha256::new();
    for name in FEATURE_NAMES {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(rows.to_le_bytes());
    for (class, count) in class_counts {
        hasher.update(class.as_bytes());
        hasher.update(count.to_le_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
}

/// Hostname stamp for the metadata sidecar.
pub fn host_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

impl ArtifactSet {
    /// Persist all three artifact files plus the metadata sidecar.
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir)?;

        write_sealed(&dir.join(MODEL_FILE), &self.generation, &self.model)?;
        write_sealed(&dir.join(SCALER_FILE), &self.generation, &self.scaler)?;
        write_sealed(&dir.join(LABELS_FILE), &self.generation, &self.encoder)?;

        let content = serde_json::to_string_pretty(&self.metadata)?;
        fs::write(dir.join(METADATA_FILE), content)?;

        info!(
            "Saved artifact generation {} ({} classes) to {:?}",
            self.generation,
            self.encoder.len(),
            dir
        );
        Ok(())
    }

    /// Load a generation, verifying that all files belong together.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(ArtifactError::NotFound(metadata_path));
        }

        let metadata: ArtifactMetadata = serde_json::from_str(&fs::read_to_string(&metadata_path)?)?;
        let generation = metadata.generation.clone();

        let model = read_sealed(&dir.join(MODEL_FILE), &generation)?;
        let scaler = read_sealed(&dir.join(SCALER_FILE), &generation)?;
        let encoder: LabelEncoder = read_sealed(&dir.join(LABELS_FILE), &generation)?;

        info!(
            "Loaded artifact generation {} (trained {}, {} classes)",
            generation,
            metadata.trained_at.format("%Y-%m-%d %H:%M:%S"),
            encoder.len()
        );

        Ok(Self {
            generation,
            metadata,
            model,
            scaler,
            encoder,
        })
    }
}

fn write_sealed<T: Serialize>(path: &Path, generation: &str, payload: &T) -> Result<(), ArtifactError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let sealed = Sealed {
        generation: generation.to_string(),
        payload,
    };
    bincode::serde::encode_into_std_write(&sealed, &mut writer, bincode::config::standard())?;
    Ok(())
}

fn read_sealed<T: DeserializeOwned>(path: &Path, expected: &str) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let sealed: Sealed<T> =
        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;

    if sealed.generation != expected {
        return Err(ArtifactError::GenerationMismatch {
            file: path.display().to_string(),
            found: sealed.generation,
            expected: expected.to_string(),
        });
    }

    Ok(sealed.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::features::{FeatureVector, NUM_FEATURES};
    use crate::model::BoostConfig;

    fn make_artifacts(generation: &str) -> ArtifactSet {
        let x: Vec<FeatureVector> = (0..20)
            .map(|i| FeatureVector([if i < 10 { 0.1 } else { 0.9 }; NUM_FEATURES]))
            .collect();
        let y: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();

        let scaler = MinMaxScaler::fit(&x);
        let mut model = GradientBoostClassifier::new(BoostConfig {
            n_estimators: 5,
            ..Default::default()
        });
        model.fit(&scaler.transform_batch(&x), &y, 2);

        let encoder = LabelEncoder::fit(&["BENIGN", "DoS"]);
        let metadata = ArtifactMetadata {
            generation: generation.to_string(),
            trained_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            train_rows: 16,
            test_rows: 4,
            classes: encoder.classes().to_vec(),
            host_id: host_id(),
        };

        ArtifactSet {
            generation: generation.to_string(),
            metadata,
            model,
            scaler,
            encoder,
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let artifacts = make_artifacts("abc123");
        artifacts.save(temp.path()).unwrap();

        let loaded = ArtifactSet::load(temp.path()).unwrap();

        assert_eq!(loaded.generation, "abc123");
        assert_eq!(loaded.encoder, artifacts.encoder);
        assert_eq!(loaded.scaler, artifacts.scaler);

        let probe = FeatureVector([0.85; NUM_FEATURES]);
        assert_eq!(loaded.model.predict(&probe), artifacts.model.predict(&probe));
    }

    #[test]
    fn test_mixed_generations_rejected() {
        let temp = TempDir::new().unwrap();
        make_artifacts("gen-one").save(temp.path()).unwrap();

        // Overwrite the scaler with a file from a different generation
        let other = TempDir::new().unwrap();
        make_artifacts("gen-two").save(other.path()).unwrap();
        fs::copy(other.path().join(SCALER_FILE), temp.path().join(SCALER_FILE)).unwrap();

        assert!(matches!(
            ArtifactSet::load(temp.path()),
            Err(ArtifactError::GenerationMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        make_artifacts("gen").save(temp.path()).unwrap();
        fs::remove_file(temp.path().join(MODEL_FILE)).unwrap();

        assert!(matches!(
            ArtifactSet::load(temp.path()),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_distribution() {
        let mut counts = BTreeMap::new();
        counts.insert("BENIGN".to_string(), 100usize);
        counts.insert("DoS".to_string(), 10usize);

        let a = generation_fingerprint(&counts, 110);
        let b = generation_fingerprint(&counts, 110);
        assert_eq!(a, b);

        counts.insert("DoS".to_string(), 11usize);
        assert_ne!(a, generation_fingerprint(&counts, 111));
    }
}
