//! Per-burst statistic table.
//!
//! Maps a base parameter name (`TEMP`, `PSAL`, ...) to the pair of statistics
//! that define the burst's acceptance band `average ± scale * dispersion`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_scale() -> f64 {
    1.0
}

/// Statistics for one physical parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstStatisticSpec {
    /// Registry name of the location statistic.
    pub average: String,
    /// Registry name of the spread statistic.
    pub dispersion: String,
    /// Multiplier applied to the spread statistic.
    #[serde(default = "default_scale")]
    pub dispersion_scale: f64,
}

impl BurstStatisticSpec {
    pub fn new(average: &str, dispersion: &str) -> Self {
        Self {
            average: average.to_string(),
            dispersion: dispersion.to_string(),
            dispersion_scale: 1.0,
        }
    }
}

/// Burst statistic table keyed by base parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BurstConfig {
    pub parameters: BTreeMap<String, BurstStatisticSpec>,
}

impl Default for BurstConfig {
    fn default() -> Self {
        let mut parameters = BTreeMap::new();
        for name in ["TEMP", "PSAL", "CNDC", "PRES", "PRES_REL", "DEPTH"] {
            parameters.insert(name.to_string(), BurstStatisticSpec::new("mean", "std"));
        }
        // Optical and oxygen channels are prone to fouling spikes
        for name in ["TURB", "CPHL", "CHLF", "DOX1", "DOX2"] {
            parameters.insert(name.to_string(), BurstStatisticSpec::new("median", "mad"));
        }
        Self { parameters }
    }
}

impl BurstConfig {
    /// Statistics configured for a base parameter name.
    pub fn for_parameter(&self, base_name: &str) -> Option<&BurstStatisticSpec> {
        self.parameters.get(base_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_core_parameters() {
        let cfg = BurstConfig::default();
        assert_eq!(cfg.for_parameter("TEMP").unwrap().average, "mean");
        assert_eq!(cfg.for_parameter("TURB").unwrap().dispersion, "mad");
        assert!(cfg.for_parameter("TEMP_1").is_none());
        assert!(cfg.for_parameter("UCUR").is_none());
    }

    #[test]
    fn scale_defaults_to_one() {
        let cfg: BurstConfig =
            serde_json::from_str(r#"{"TEMP": {"average": "median", "dispersion": "iqr"}}"#)
                .unwrap();
        let spec = cfg.for_parameter("TEMP").unwrap();
        assert_eq!(spec.dispersion_scale, 1.0);
        assert_eq!(spec.dispersion, "iqr");
    }
}
