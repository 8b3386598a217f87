//! Label encoding
//!
//! Bijective mapping between class names and dense integer codes. The
//! fitted class list is persisted with the model artifacts and reused at
//! inference; it is never re-fit against live data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Fitted label encoder. Class codes are assigned in sorted name order,
/// so fitting the same label set always yields the same table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit the encoder over a set of observed labels.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self { classes }
    }

    /// Encode a class name to its integer code.
    pub fn encode(&self, name: &str) -> Option<usize> {
        // Class list is sorted, so binary search is exact
        self.classes.binary_search_by(|c| c.as_str().cmp(name)).ok()
    }

    /// Decode an integer code back to its class name.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(|s| s.as_str())
    }

    /// Encode a batch of labels, failing on any name not seen during fit.
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, DatasetError> {
        labels
            .iter()
            .map(|l| {
                self.encode(l.as_ref())
                    .ok_or_else(|| DatasetError::UnknownLabel(l.as_ref().to_string()))
            })
            .collect()
    }

    /// The fitted class names, in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the encoder has been fit.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
