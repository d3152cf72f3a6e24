//! Ocean QC common types, identities, and errors.
//!
//! This crate provides foundational types shared across the QC crates:
//! - The ordinal flag scale and swappable flag numbering schemes
//! - Dataset identity used to key persisted parameter overrides
//! - Parameter-name normalization (`TEMP_2` → `TEMP`)
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod flags;
pub mod id;
pub mod names;
pub mod output;

pub use error::{Error, ErrorCategory, Result};
pub use flags::{Flag, FlagCode, FlagSet, FlagSetError};
pub use id::DatasetId;
pub use names::base_parameter_name;
pub use output::OutputFormat;

/// Schema version for persisted QC artifacts (override records, outcomes).
pub const SCHEMA_VERSION: &str = "1.0.0";
