//! Flag set selection.

use qc_common::FlagSet;
use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Either the name of a built-in flag set or an inline custom scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagSetConfig {
    Builtin(String),
    Custom(FlagSet),
}

impl Default for FlagSetConfig {
    fn default() -> Self {
        FlagSetConfig::Builtin("imos".to_string())
    }
}

impl FlagSetConfig {
    /// Materialize the configured flag set.
    pub fn build(&self) -> ValidationResult<FlagSet> {
        let set = match self {
            FlagSetConfig::Builtin(name) => FlagSet::builtin(name)
                .map_err(|e| ValidationError::InvalidValue {
                    field: "flag_set".to_string(),
                    message: e.to_string(),
                })?,
            FlagSetConfig::Custom(set) => set.clone(),
        };
        set.validate().map_err(|e| ValidationError::InvalidValue {
            field: "flag_set".to_string(),
            message: e.to_string(),
        })?;
        Ok(set)
    }
}
