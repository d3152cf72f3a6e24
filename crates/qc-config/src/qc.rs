//! Top-level QC configuration document.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::burst::BurstConfig;
use crate::flag_set::FlagSetConfig;
use crate::resolve::{resolve_config, ConfigPath};
use crate::snapshot::ConfigSnapshot;
use crate::spike::SpikeConfig;
use crate::validate::{validate_config, ValidationError};
use crate::velocity::VelocityConfig;
use qc_math::StatisticRegistry;

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

/// Parameters for every configurable QC test.
///
/// Every section is optional in JSON; a missing section falls back to the
/// built-in table for that test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub flag_set: FlagSetConfig,

    #[serde(default)]
    pub burst: BurstConfig,

    #[serde(default)]
    pub spike: SpikeConfig,

    #[serde(default)]
    pub velocity: VelocityConfig,

    /// Directory for persisted parameter overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_dir: Option<PathBuf>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            flag_set: FlagSetConfig::default(),
            burst: BurstConfig::default(),
            spike: SpikeConfig::default(),
            velocity: VelocityConfig::default(),
            overrides_dir: None,
        }
    }
}

impl QcConfig {
    /// Parse configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

/// Configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: QcConfig,
    pub path: ConfigPath,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, parse and validate the configuration.
pub fn load_config(
    cli_path: Option<&Path>,
    registry: &StatisticRegistry,
) -> Result<LoadedConfig, ValidationError> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    }

    let path = resolve_config(cli_path);
    let (config, raw) = match &path.path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", p.display(), e))
            })?;
            (QcConfig::from_str(&raw)?, Some(raw))
        }
        None => (QcConfig::default(), None),
    };

    validate_config(&config, registry)?;
    let snapshot = ConfigSnapshot::new(&config, &path, raw.as_deref());
    Ok(LoadedConfig {
        config,
        path,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ConfigSource;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = QcConfig::from_str("{}").unwrap();
        assert_eq!(cfg, QcConfig::default());
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qc.json");
        std::fs::write(
            &path,
            r#"{"flag_set": "argo", "velocity": {"correlation_magnitude": {"cmag": 120}}}"#,
        )
        .unwrap();
        let loaded = load_config(Some(&path), &StatisticRegistry::with_builtins()).unwrap();
        assert_eq!(loaded.path.source, ConfigSource::CliArgument);
        assert_eq!(loaded.config.velocity.correlation_magnitude.cmag, 120.0);
        assert_eq!(loaded.snapshot.summary.flag_set, "argo");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config(
            Some(Path::new("/nonexistent/qc.json")),
            &StatisticRegistry::with_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::IoError(_)));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            QcConfig::from_str("{not json"),
            Err(ValidationError::ParseError(_))
        ));
    }
}
