//! Application configuration
//!
//! Every heuristic in the pipeline lives here as explicit, overridable
//! data: label-column candidates, leak columns, rare-class buckets,
//! test fraction, resampling target, model parameters and stream pacing.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactConfig;
use crate::dataset::DatasetConfig;
use crate::model::BoostConfig;
use crate::resample::ResampleConfig;
use crate::split::SplitConfig;
use crate::stream::StreamConfig;
use crate::trainer::TrainerConfig;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "flowsentry.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub resample: ResampleConfig,

    #[serde(default)]
    pub model: BoostConfig,

    #[serde(default)]
    pub trainer: TrainerConfig,

    #[serde(default)]
    pub artifacts: ArtifactConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load from an explicit path, from `flowsentry.toml` if present, or
    /// fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Render the default configuration as TOML.
    pub fn example() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
