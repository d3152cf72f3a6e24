//! Dataset identity.
//!
//! A dataset is identified by a stable string, usually the path of the file it
//! was loaded from. The identity keys persisted parameter overrides, so two
//! runs over the same file resolve to the same record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identity of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl DatasetId {
    pub fn new(identity: impl Into<String>) -> Self {
        DatasetId(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full SHA-256 hex digest of the identity string.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Short, filesystem-safe stem used to name the override record.
    pub fn record_stem(&self) -> String {
        self.digest()[..16].to_string()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        DatasetId(s.to_string())
    }
}

impl From<String> for DatasetId {
    fn from(s: String) -> Self {
        DatasetId(s)
    }
}
