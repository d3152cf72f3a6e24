//! Ocean QC configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the per-test parameter tables (`qc.json`)
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation against the statistic registry
//! - Config snapshots for audit trails

pub mod burst;
pub mod flag_set;
pub mod qc;
pub mod resolve;
pub mod snapshot;
pub mod spike;
pub mod validate;
pub mod velocity;

pub use burst::{BurstConfig, BurstStatisticSpec};
pub use flag_set::FlagSetConfig;
pub use qc::{load_config, LoadedConfig, QcConfig};
pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use spike::{PressureDependentThreshold, SpikeConfig, SpikeThreshold};
pub use validate::{validate_config, ValidationError, ValidationResult};
pub use velocity::VelocityConfig;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
