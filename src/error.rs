//! Error types for the training and scoring pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while projecting a record onto the feature contract.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("missing feature field: {0}")]
    MissingField(&'static str),

    #[error("non-finite value for {name}: {value}")]
    NotFinite { name: &'static str, value: f32 },
}

/// Errors produced during dataset loading and preparation.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset has no rows after cleaning")]
    Empty,

    #[error("contract feature column not found in dataset: {0}")]
    MissingColumn(&'static str),

    #[error("contract feature '{0}' is listed as a leak column; fix the configuration")]
    ContractColumnLeaky(String),

    #[error("label '{0}' was not seen during encoder fitting")]
    UnknownLabel(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors around persisted artifact generations.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("artifact generation mismatch in {file}: found {found}, expected {expected}")]
    GenerationMismatch {
        file: String,
        found: String,
        expected: String,
    },

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-flow scoring errors. These are always recoverable: the streaming
/// loop logs them and moves on to the next flow.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("model predicted unknown class code {0}")]
    UnknownClass(usize),

    #[error("malformed flow record: {0}")]
    Malformed(String),
}
