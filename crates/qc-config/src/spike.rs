//! Spike test threshold table.
//!
//! Only variables listed here are spike-tested. The threshold applied to the
//! curvature statistic is either a constant, a constant chosen by the local
//! pressure (shallow vs deep water), or an adaptive five-point aggregate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_split_dbar() -> f64 {
    500.0
}

fn default_pressure_variables() -> Vec<String> {
    vec!["PRES".to_string(), "PRES_REL".to_string(), "DEPTH".to_string()]
}

/// Threshold that switches at a pressure level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureDependentThreshold {
    /// Threshold where pressure < `split_dbar` (or pressure is unknown).
    pub shallow: f64,
    /// Threshold where pressure >= `split_dbar`.
    pub deep: f64,
    #[serde(default = "default_split_dbar")]
    pub split_dbar: f64,
    /// Auxiliary variables searched, in order, for the pressure series.
    #[serde(default = "default_pressure_variables")]
    pub pressure_variables: Vec<String>,
}

/// How the spike threshold is obtained for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeThreshold {
    Constant(f64),
    PressureDependent(PressureDependentThreshold),
    FivePointAggregate,
}

impl SpikeThreshold {
    pub fn mode_name(&self) -> &'static str {
        match self {
            SpikeThreshold::Constant(_) => "constant",
            SpikeThreshold::PressureDependent(_) => "pressure_dependent",
            SpikeThreshold::FivePointAggregate => "five_point_aggregate",
        }
    }
}

/// Spike thresholds keyed by base variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpikeConfig {
    pub variables: BTreeMap<String, SpikeThreshold>,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        let pressure = |shallow: f64, deep: f64| {
            SpikeThreshold::PressureDependent(PressureDependentThreshold {
                shallow,
                deep,
                split_dbar: default_split_dbar(),
                pressure_variables: default_pressure_variables(),
            })
        };
        let mut variables = BTreeMap::new();
        variables.insert("TEMP".to_string(), pressure(6.0, 2.0));
        variables.insert("PSAL".to_string(), pressure(0.9, 0.3));
        variables.insert("DOX1".to_string(), pressure(50.0, 25.0));
        variables.insert("DOX2".to_string(), pressure(50.0, 25.0));
        variables.insert("CNDC".to_string(), SpikeThreshold::FivePointAggregate);
        Self { variables }
    }
}

impl SpikeConfig {
    pub fn for_variable(&self, base_name: &str) -> Option<&SpikeThreshold> {
        self.variables.get(base_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_modes() {
        let cfg: SpikeConfig = serde_json::from_str(
            r#"{
                "TEMP": {"pressure_dependent": {"shallow": 6.0, "deep": 2.0}},
                "PSAL": {"constant": 0.5},
                "CNDC": "five_point_aggregate"
            }"#,
        )
        .unwrap();
        match cfg.for_variable("TEMP").unwrap() {
            SpikeThreshold::PressureDependent(p) => {
                assert_eq!(p.split_dbar, 500.0);
                assert_eq!(p.pressure_variables[0], "PRES");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            cfg.for_variable("PSAL"),
            Some(&SpikeThreshold::Constant(0.5))
        );
        assert_eq!(
            cfg.for_variable("CNDC").unwrap().mode_name(),
            "five_point_aggregate"
        );
    }

    #[test]
    fn unlisted_variables_are_absent() {
        assert!(SpikeConfig::default().for_variable("UCUR").is_none());
    }
}
