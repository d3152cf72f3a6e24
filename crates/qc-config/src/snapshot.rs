//! Configuration snapshots for audit trails and reproducibility.
//!
//! A snapshot captures the exact configuration in force for a QC run, so
//! flag decisions can be traced back to the thresholds that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::qc::QcConfig;
use crate::resolve::ConfigPath;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the config was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Source of the configuration.
    pub config_source: String,

    /// SHA-256 of the raw config content, or of the canonical defaults.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub flag_set: String,
    pub burst_parameters: Vec<String>,
    pub spike_variables: Vec<String>,
    pub cmag: f64,
    pub min_pgood: f64,
    pub ea_thresh: f64,
}

impl ConfigSnapshot {
    /// Create a snapshot from a loaded configuration and its raw content.
    pub fn new(config: &QcConfig, path: &ConfigPath, raw_json: Option<&str>) -> Self {
        let config_hash = match raw_json {
            Some(raw) => hash_content(raw),
            None => hash_content(&serde_json::to_string(config).unwrap_or_default()),
        };
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: path.path.as_ref().map(|p| p.display().to_string()),
            config_source: path.source.to_string(),
            config_hash,
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &QcConfig) -> Self {
        let flag_set = config
            .flag_set
            .build()
            .map(|s| s.name)
            .unwrap_or_else(|_| "invalid".to_string());
        ConfigSummary {
            flag_set,
            burst_parameters: config.burst.parameters.keys().cloned().collect(),
            spike_variables: config.spike.variables.keys().cloned().collect(),
            cmag: config.velocity.correlation_magnitude.cmag,
            min_pgood: config.velocity.percent_good.min_pgood,
            ea_thresh: config.velocity.echo_range.ea_thresh,
        }
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
