//! Configuration validation errors and semantic validation.

use qc_math::StatisticRegistry;
use thiserror::Error;

use crate::qc::QcConfig;
use crate::spike::SpikeThreshold;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown statistic for {field}: {name}")]
    UnknownStatistic { field: String, name: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::UnknownStatistic { .. } => 12,
            ValidationError::InvalidValue { .. } => 10,
            ValidationError::VersionMismatch { .. } => 13,
        }
    }
}

impl From<ValidationError> for qc_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownStatistic { field, name } => {
                qc_common::Error::UnknownStatistic(format!("{field}: {name}"))
            }
            other => qc_common::Error::Config(other.to_string()),
        }
    }
}

/// Validate a loaded configuration semantically.
pub fn validate_config(config: &QcConfig, registry: &StatisticRegistry) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    config.flag_set.build()?;

    for (name, spec) in &config.burst.parameters {
        for (role, stat) in [("average", &spec.average), ("dispersion", &spec.dispersion)] {
            if !registry.contains(stat) {
                return Err(ValidationError::UnknownStatistic {
                    field: format!("burst.{name}.{role}"),
                    name: stat.clone(),
                });
            }
        }
        check_non_negative(&format!("burst.{name}.dispersion_scale"), spec.dispersion_scale)?;
    }

    for (name, rule) in &config.spike.variables {
        match rule {
            SpikeThreshold::Constant(value) => {
                check_non_negative(&format!("spike.{name}.constant"), *value)?;
            }
            SpikeThreshold::PressureDependent(p) => {
                check_non_negative(&format!("spike.{name}.shallow"), p.shallow)?;
                check_non_negative(&format!("spike.{name}.deep"), p.deep)?;
                check_finite(&format!("spike.{name}.split_dbar"), p.split_dbar)?;
            }
            SpikeThreshold::FivePointAggregate => {}
        }
    }

    check_finite(
        "velocity.correlation_magnitude.cmag",
        config.velocity.correlation_magnitude.cmag,
    )?;
    check_finite(
        "velocity.percent_good.min_pgood",
        config.velocity.percent_good.min_pgood,
    )?;
    check_non_negative(
        "velocity.echo_range.ea_thresh",
        config.velocity.echo_range.ea_thresh,
    )?;

    Ok(())
}

fn check_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be finite, got {}", value),
        });
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be >= 0, got {}", value),
        });
    }
    Ok(())
}
