//! Flow feature contract
//!
//! The single ordered list of features shared by the offline training
//! pipeline and the live scorer. Both paths project through this module,
//! so the model always sees the same vector layout: any change here is a
//! new model generation, never a silent drift between the two pipelines.

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Contract feature names, in model input order.
///
/// Names match the labeled dataset's column headers; the live path derives
/// the same quantities from a [`FlowRecord`].
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Destination Port",
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Fwd Packet Length Max",
    "Bwd Packet Length Max",
    "Flow Bytes/s",
    "Flow Packets/s",
];

/// Number of features in the contract.
pub const NUM_FEATURES: usize = 10;

/// A completed bidirectional flow as delivered by the capture engine.
///
/// The capture/flow-assembly engine is external; this is the narrow record
/// it hands over once a flow completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Server-side (destination) port
    pub dst_port: u16,
    /// Bidirectional flow duration in milliseconds
    pub duration_ms: f32,
    /// Packets client -> server
    pub fwd_packets: u64,
    /// Packets server -> client
    pub bwd_packets: u64,
    /// Bytes client -> server
    pub fwd_bytes: u64,
    /// Bytes server -> client
    pub bwd_bytes: u64,
    /// Largest forward packet size
    pub fwd_max_pkt_len: f32,
    /// Largest backward packet size
    pub bwd_max_pkt_len: f32,
    /// Aggregate bytes, both directions
    pub total_bytes: u64,
    /// Aggregate packets, both directions
    pub total_packets: u64,
}

impl FlowRecord {
    /// One-line summary for the prediction stream.
    pub fn summary(&self) -> String {
        format!(
            "port {} {:.0}ms {}f/{}b pkts {}B",
            self.dst_port, self.duration_ms, self.fwd_packets, self.bwd_packets, self.total_bytes
        )
    }
}

/// An ordered vector of exactly [`NUM_FEATURES`] contract features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; NUM_FEATURES]);

impl FeatureVector {
    /// Project a live flow onto the contract.
    ///
    /// The two rate features are derived with [`safe_div`]: a zero-duration
    /// flow yields zero rates, never NaN or infinity.
    pub fn from_flow(flow: &FlowRecord) -> Result<Self, FeatureError> {
        let duration_secs = flow.duration_ms / 1000.0;
        Self::checked([
            flow.dst_port as f32,
            flow.duration_ms,
            flow.fwd_packets as f32,
            flow.bwd_packets as f32,
            flow.fwd_bytes as f32,
            flow.bwd_bytes as f32,
            flow.fwd_max_pkt_len,
            flow.bwd_max_pkt_len,
            safe_div(flow.total_bytes as f32, duration_secs),
            safe_div(flow.total_packets as f32, duration_secs),
        ])
    }

    /// Build a vector from named fields (the batch/CSV path).
    ///
    /// Iterates the same `FEATURE_NAMES` list as the live path, so batch and
    /// streaming rows can never disagree on order.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, FeatureError>
    where
        F: FnMut(&str) -> Option<f32>,
    {
        let mut values = [0.0f32; NUM_FEATURES];
        for (i, &name) in FEATURE_NAMES.iter().enumerate() {
            values[i] = lookup(name).ok_or(FeatureError::MissingField(name))?;
        }
        Self::checked(values)
    }

    fn checked(values: [f32; NUM_FEATURES]) -> Result<Self, FeatureError> {
        for (i, v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(FeatureError::NotFinite {
                    name: FEATURE_NAMES[i],
                    value: *v,
                });
            }
        }
        Ok(Self(values))
    }

    /// Get a feature by contract name.
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.0[idx])
    }

    /// All features as a slice, in contract order.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Division-by-zero-safe rate rule: a zero denominator yields zero.
pub fn safe_div(num: f32, den: f32) -> f32 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
