//! flowsentry — supervised network flow classification
//!
//! An offline training pipeline and a real-time scorer sharing one
//! feature-and-label contract. Training loads a labeled flow dataset,
//! splits it stratified, fits a min-max scaler on the training partition
//! only, oversamples minority classes, fits a gradient-boosted classifier
//! and persists one consistent artifact generation. The streaming scorer
//! loads that generation and replays the exact same feature projection
//! and scaling against live flows, one at a time, forever.
//!
//! # Example
//! ```ignore
//! use flowsentry::{Config, Dataset, Trainer};
//!
//! let config = Config::default();
//! let dataset = Dataset::load_csv("flows.csv".as_ref(), &config.dataset)?;
//! let outcome = Trainer::new(config).run(&dataset)?;
//! outcome.artifacts.save("artifacts".as_ref())?;
//! ```

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod resample;
pub mod scaler;
pub mod split;
pub mod stream;
pub mod trainer;

pub use artifacts::{ArtifactMetadata, ArtifactSet};
pub use config::Config;
pub use dataset::Dataset;
pub use features::{FeatureVector, FlowRecord, FEATURE_NAMES, NUM_FEATURES};
pub use labels::LabelEncoder;
pub use metrics::EvalReport;
pub use model::{BoostConfig, GradientBoostClassifier};
pub use scaler::MinMaxScaler;
pub use stream::{FlowSource, JsonlFlowSource, ScoreOutcome, StreamingScorer};
pub use trainer::{TrainOutcome, Trainer};
