//! Error types for Ocean QC.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for batch drivers
//!
//! Only structural problems are errors. A test whose inputs are absent
//! (missing TIME axis, missing beam channels, unconfigured parameter) is not
//! an error; it is skipped by the caller-facing outcome type in `qc-core`.
//!
//! # JSON Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 22,
//!   "category": "dataset",
//!   "message": "variable TEMP: flags shape [10, 1] does not match data shape [12, 1]",
//!   "recoverable": false
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Ocean QC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors (flag sets, statistic tables, thresholds).
    Config,
    /// Malformed datasets or invalid targets.
    Dataset,
    /// Parameter override persistence.
    Overrides,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Dataset => write!(f, "dataset"),
            ErrorCategory::Overrides => write!(f, "overrides"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Ocean QC.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid flag set: {0}")]
    InvalidFlagSet(String),

    #[error("unknown statistic: {0}")]
    UnknownStatistic(String),

    // Dataset errors (20-29)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("variable {variable}: {what} shape {actual:?} does not match data shape {expected:?}")]
    ShapeMismatch {
        variable: String,
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: String,
        index: usize,
        len: usize,
    },

    // Override store errors (30-39)
    #[error("override store error: {0}")]
    OverrideStore(String),

    #[error("override record locked: {path}")]
    LockUnavailable { path: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Dataset errors
    /// - 30-39: Override store errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidFlagSet(_) => 11,
            Error::UnknownStatistic(_) => 12,
            Error::InvalidInput(_) => 20,
            Error::MissingField(_) => 21,
            Error::ShapeMismatch { .. } => 22,
            Error::IndexOutOfRange { .. } => 23,
            Error::OverrideStore(_) => 30,
            Error::LockUnavailable { .. } => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidFlagSet(_) | Error::UnknownStatistic(_) => {
                ErrorCategory::Config
            }

            Error::InvalidInput(_)
            | Error::MissingField(_)
            | Error::ShapeMismatch { .. }
            | Error::IndexOutOfRange { .. } => ErrorCategory::Dataset,

            Error::OverrideStore(_) | Error::LockUnavailable { .. } => ErrorCategory::Overrides,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Dataset errors are fatal for the dataset they concern: a batch driver
    /// should stop that dataset and move on to the next one.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidFlagSet(_) | Error::UnknownStatistic(_) => true,

            Error::InvalidInput(_)
            | Error::MissingField(_)
            | Error::ShapeMismatch { .. }
            | Error::IndexOutOfRange { .. } => false,

            // Contention is transient
            Error::LockUnavailable { .. } => true,
            Error::OverrideStore(_) => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidFlagSet(_) => "Invalid Flag Set",
            Error::UnknownStatistic(_) => "Unknown Statistic",
            Error::InvalidInput(_) => "Invalid Input",
            Error::MissingField(_) => "Missing Dataset Field",
            Error::ShapeMismatch { .. } => "Shape Mismatch",
            Error::IndexOutOfRange { .. } => "Index Out Of Range",
            Error::OverrideStore(_) => "Override Store Error",
            Error::LockUnavailable { .. } => "Override Record Locked",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., variable name, index).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::ShapeMismatch { variable, .. } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::IndexOutOfRange { kind, index, len } => {
                context.insert("kind".to_string(), serde_json::json!(kind));
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("len".to_string(), serde_json::json!(len));
            }
            Error::LockUnavailable { path } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Result of processing several datasets, where one dataset's fatal error
/// does not stop the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult<T> {
    /// Successfully completed items.
    pub succeeded: Vec<T>,

    /// Failed items with their errors.
    pub failed: Vec<BatchError>,
}

/// A single error in a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Identifier of the failed item (usually the dataset identity).
    pub item_id: String,

    /// The structured error.
    pub error: StructuredError,
}

impl<T> BatchResult<T> {
    /// Add a failure to the batch result.
    pub fn add_failure(&mut self, item_id: impl Into<String>, error: &Error) {
        self.failed.push(BatchError {
            item_id: item_id.into(),
            error: StructuredError::from(error),
        });
    }

    /// Add a success to the batch result.
    pub fn add_success(&mut self, item: T) {
        self.succeeded.push(item);
    }

    /// Whether every item succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, reset) = if use_color {
        ("\x1b[31m", "\x1b[0m")
    } else {
        ("", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}",
        red = red,
        reset = reset,
        headline = err.headline(),
        message = err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::InvalidInput("x".into()).code(), 20);
        assert_eq!(Error::OverrideStore("x".into()).code(), 30);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::UnknownStatistic("trimean".into()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            Error::IndexOutOfRange {
                kind: "variable".into(),
                index: 9,
                len: 3
            }
            .category(),
            ErrorCategory::Dataset
        );
    }

    #[test]
    fn test_dataset_errors_are_fatal() {
        assert!(!Error::InvalidInput("bad".into()).is_recoverable());
        assert!(!Error::MissingField("TIME".into()).is_recoverable());
        assert!(Error::LockUnavailable { path: "x".into() }.is_recoverable());
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = Error::IndexOutOfRange {
            kind: "variable".into(),
            index: 7,
            len: 2,
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 23);
        assert_eq!(structured.category, ErrorCategory::Dataset);
        assert!(!structured.recoverable);
        assert_eq!(structured.context["index"], serde_json::json!(7));
        let json = structured.to_json();
        assert!(json.contains(r#""category":"dataset""#));
    }

    #[test]
    fn test_batch_result_isolates_failures() {
        let mut batch: BatchResult<String> = BatchResult::default();
        batch.add_success("a.nc".to_string());
        batch.add_failure("b.nc", &Error::MissingField("TIME".into()));
        batch.add_success("c.nc".to_string());
        assert_eq!(batch.succeeded.len(), 2);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].item_id, "b.nc");
        assert!(!batch.all_succeeded());
    }

    #[test]
    fn test_format_error_human() {
        let out = format_error_human(&Error::Config("no burst table".into()), false);
        assert!(out.starts_with("✗ Configuration Error"));
        assert!(out.contains("Reason: configuration error: no burst table"));
    }
}
