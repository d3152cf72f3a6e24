//! Ocean QC Core Library
//!
//! This library provides the flag-computation engine for oceanographic
//! quality control:
//! - Dataset model and JSON persistence
//! - Burst segmentation of duty-cycled time series
//! - QC tests (per-burst outlier, multi-beam diagnostics, spike) behind the
//!   [`qc::QcTest`] trait
//! - Per-dataset parameter override store
//! - Structured logging and CLI exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod burst;
pub mod dataset;
pub mod exit_codes;
pub mod logging;
pub mod overrides;
pub mod qc;

pub use dataset::{Dataset, Target, TargetKind};
pub use overrides::{OverrideRecord, OverrideStore, OverrideStoreError};
pub use qc::{run_test, QcContext, QcOutcome, QcTest, SkipReason};
