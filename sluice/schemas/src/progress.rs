//! Progress event types for tracking pipeline execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three independently runnable pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingest,
    Load,
    Transform,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Ingest => write!(f, "ingest"),
            PipelineStage::Load => write!(f, "load"),
            PipelineStage::Transform => write!(f, "transform"),
        }
    }
}

/// Progress events emitted during pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A stage started with a known number of work units
    StageStarted {
        stage: PipelineStage,
        units: usize,
    },
    /// A work unit started an attempt (attempts start at 1)
    UnitStarted {
        stage: PipelineStage,
        unit: String,
        attempt: u32,
    },
    /// A work unit failed with a transient error and will be attempted again
    UnitRetrying {
        stage: PipelineStage,
        unit: String,
        attempt: u32,
        error: String,
    },
    /// A work unit finished successfully
    UnitCompleted {
        stage: PipelineStage,
        unit: String,
        duration_ms: u64,
    },
    /// A work unit failed for good
    UnitFailed {
        stage: PipelineStage,
        unit: String,
        error: String,
    },
    /// A stage finished, possibly with failed units
    StageCompleted {
        stage: PipelineStage,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}
