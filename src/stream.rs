//! Streaming scorer
//!
//! Consumes completed flow records one at a time from an external flow
//! source, replays the offline feature contract and scaler against each,
//! and emits a continuous prediction stream. Each flow scores
//! independently against the immutable loaded artifact set; a bad flow
//! yields a `Skipped` outcome and the loop moves on.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::ArtifactSet;
use crate::error::ScoreError;
use crate::features::{FeatureVector, FlowRecord};

/// Streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Pacing delay between predictions, in milliseconds. A throttle,
    /// not a correctness requirement.
    pub pacing_ms: u64,
    /// Default flow source path; stdin when unset
    pub source: Option<PathBuf>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 100,
            source: None,
        }
    }
}

/// A source of completed bidirectional flows.
///
/// The capture/flow-assembly engine lives outside this crate; anything
/// that can hand over `FlowRecord`s in order can drive the scorer.
pub trait FlowSource {
    fn next_flow(&mut self) -> Option<Result<FlowRecord, ScoreError>>;
}

/// JSON-lines flow source: one flow record per line.
pub struct JsonlFlowSource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl JsonlFlowSource<BufReader<File>> {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl JsonlFlowSource<BufReader<io::Stdin>> {
    pub fn from_stdin() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> JsonlFlowSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> FlowSource for JsonlFlowSource<R> {
    fn next_flow(&mut self) -> Option<Result<FlowRecord, ScoreError>> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let trimmed = self.line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(trimmed).map_err(|e| {
                        ScoreError::Malformed(format!("line {}: {}", self.line_no, e))
                    }));
                }
                Err(e) => {
                    self.line_no += 1;
                    return Some(Err(ScoreError::Malformed(format!(
                        "line {}: {}",
                        self.line_no, e
                    ))));
                }
            }
        }
    }
}

/// A successful single-flow prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub code: usize,
}

/// Explicit per-flow outcome consumed by the supervising loop.
#[derive(Debug, Clone)]
pub enum ScoreOutcome {
    Scored { summary: String, label: String },
    Skipped { reason: String },
}

/// Counters for a finished (or drained) stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    pub scored: u64,
    pub skipped: u64,
}

/// Scores flows against one loaded artifact generation.
///
/// Holds no cross-flow state: the artifact set is read-only after load
/// and each flow is scored independently.
pub struct StreamingScorer {
    artifacts: ArtifactSet,
}

impl StreamingScorer {
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self { artifacts }
    }

    /// Score a single flow: contract projection, scaler apply, predict,
    /// decode.
    pub fn score(&self, flow: &FlowRecord) -> Result<Prediction, ScoreError> {
        let features = FeatureVector::from_flow(flow)?;
        let scaled = self.artifacts.scaler.transform(&features);
        let code = self.artifacts.model.predict(&scaled);
        let label = self
            .artifacts
            .encoder
            .decode(code)
            .ok_or(ScoreError::UnknownClass(code))?;

        Ok(Prediction {
            label: label.to_string(),
            code,
        })
    }

    /// Drive the supervising loop until the source is exhausted.
    ///
    /// Failures are logged and never terminate the stream. With an
    /// unbounded source this only returns on external termination.
    pub fn run<S: FlowSource>(&self, source: &mut S, pacing: Duration) -> StreamStats {
        info!(
            "Scoring flows with artifact generation {} ({} classes)",
            self.artifacts.generation,
            self.artifacts.encoder.len()
        );

        let mut stats = StreamStats::default();

        while let Some(next) = source.next_flow() {
            let outcome = match next {
                Ok(flow) => match self.score(&flow) {
                    Ok(prediction) => ScoreOutcome::Scored {
                        summary: flow.summary(),
                        label: prediction.label,
                    },
                    Err(e) => ScoreOutcome::Skipped {
                        reason: e.to_string(),
                    },
                },
                Err(e) => ScoreOutcome::Skipped {
                    reason: e.to_string(),
                },
            };

            match &outcome {
                ScoreOutcome::Scored { summary, label } => {
                    stats.scored += 1;
                    let verdict = if label.eq_ignore_ascii_case("benign") {
                        label.as_str().green()
                    } else {
                        label.as_str().red().bold()
                    };
                    println!("[+] {} => {}", summary, verdict);
                }
                ScoreOutcome::Skipped { reason } => {
                    stats.skipped += 1;
                    warn!("Skipping flow: {}", reason);
                }
            }

            if !pacing.is_zero() {
                std::thread::sleep(pacing);
            }
        }

        info!(
            "Flow source ended: {} scored, {} skipped",
            stats.scored, stats.skipped
        );
        stats
    }
}
