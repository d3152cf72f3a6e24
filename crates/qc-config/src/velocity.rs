//! Default thresholds for the multi-beam velocity diagnostic tests.

use serde::{Deserialize, Serialize};

fn default_cmag() -> f64 {
    64.0
}

fn default_min_pgood() -> f64 {
    80.0
}

fn default_ea_thresh() -> f64 {
    50.0
}

/// Correlation magnitude test: a beam passes when its correlation exceeds `cmag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMagnitudeParams {
    #[serde(default = "default_cmag")]
    pub cmag: f64,
}

/// Percent-good test: a cell passes when 3-beam + 4-beam solutions exceed `min_pgood`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentGoodParams {
    #[serde(default = "default_min_pgood")]
    pub min_pgood: f64,
}

/// Echo intensity range test: a cell fails when the inter-beam spread exceeds `ea_thresh` counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoRangeParams {
    #[serde(default = "default_ea_thresh")]
    pub ea_thresh: f64,
}

impl Default for CorrelationMagnitudeParams {
    fn default() -> Self {
        Self {
            cmag: default_cmag(),
        }
    }
}

impl Default for PercentGoodParams {
    fn default() -> Self {
        Self {
            min_pgood: default_min_pgood(),
        }
    }
}

impl Default for EchoRangeParams {
    fn default() -> Self {
        Self {
            ea_thresh: default_ea_thresh(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default)]
    pub correlation_magnitude: CorrelationMagnitudeParams,
    #[serde(default)]
    pub percent_good: PercentGoodParams,
    #[serde(default)]
    pub echo_range: EchoRangeParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: VelocityConfig =
            serde_json::from_str(r#"{"correlation_magnitude": {"cmag": 110}}"#).unwrap();
        assert_eq!(cfg.correlation_magnitude.cmag, 110.0);
        assert_eq!(cfg.percent_good.min_pgood, 80.0);
        assert_eq!(cfg.echo_range.ea_thresh, 50.0);
    }
}
