//! Lookup of QC tests by canonical name.

use super::{BeamDiagnostic, BurstOutlierTest, MultiBeamTest, QcTest, SpikeTest};

/// Every known test, in the order `run` applies them when none are named.
pub const TEST_NAMES: [&str; 5] = [
    "burst",
    "spike",
    "correlation_magnitude",
    "percent_good",
    "echo_range",
];

/// The test registered under `name`.
pub fn by_name(name: &str) -> Option<Box<dyn QcTest>> {
    if name == super::burst_outlier::NAME {
        return Some(Box::new(BurstOutlierTest));
    }
    if name == super::spike::NAME {
        return Some(Box::new(SpikeTest));
    }
    BeamDiagnostic::ALL
        .into_iter()
        .find(|d| d.name() == name)
        .map(|d| Box::new(MultiBeamTest::new(d)) as Box<dyn QcTest>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_name_resolves_to_itself() {
        for name in TEST_NAMES {
            let test = by_name(name).unwrap();
            assert_eq!(test.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(by_name("gradient").is_none());
        assert!(by_name("").is_none());
    }
}
