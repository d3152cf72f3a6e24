//! Structured event definitions for logging.
//!
//! Events follow a consistent schema for machine-parseable JSONL output.
//! Every event carries the run correlation ID and, once a dataset is being
//! processed, that dataset's identity.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Processing stages of a QC run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and dataset loading.
    Init,
    /// Burst segmentation and other per-target preparation.
    Segment,
    /// Test evaluation.
    Evaluate,
    /// Writing outcome flags into the dataset.
    Apply,
    /// Override store reads and writes.
    Persist,
    /// Summary and dataset output.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Segment => "segment",
            Stage::Evaluate => "evaluate",
            Stage::Apply => "apply",
            Stage::Persist => "persist",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Dataset I/O
    pub const DATASET_LOADED: &str = "dataset.loaded";
    pub const DATASET_SAVED: &str = "dataset.saved";
    pub const DATASET_FAILED: &str = "dataset.failed";

    // Segment stage
    pub const SEGMENT_BURSTS: &str = "segment.bursts";

    // Evaluate / apply stages
    pub const TEST_FINISHED: &str = "test.finished";
    pub const PARAM_PROMPTED: &str = "test.param_prompted";

    // Persist stage
    pub const OVERRIDE_WRITTEN: &str = "overrides.written";
    pub const OVERRIDE_RESET: &str = "overrides.reset";
}

/// Correlation context shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Identity of the dataset being processed, if any.
    pub dataset: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            dataset: None,
        }
    }

    /// Narrow the context to one dataset.
    pub fn with_dataset(&self, dataset: impl Into<String>) -> Self {
        LogContext {
            run_id: self.run_id.clone(),
            dataset: Some(dataset.into()),
        }
    }
}
