//! Property-based tests for qc-math statistics.
//!
//! Uses proptest to verify statistical properties hold across many random inputs.

use proptest::prelude::*;
use qc_math::{
    count_present, mad, max, mean, median, min, std_dev, three_point_curvature, StatisticRegistry,
};

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-9;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

fn samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e4..1.0e4f64, 1..64)
}

fn samples_with_gaps() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![4 => (-1.0e4..1.0e4f64), 1 => Just(f64::NAN)], 0..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Location statistics stay inside the sample range.
    #[test]
    fn location_within_range(v in samples()) {
        let lo = min(&v);
        let hi = max(&v);
        let m = mean(&v);
        let med = median(&v);
        prop_assert!(m >= lo - TOL && m <= hi + TOL);
        prop_assert!(med >= lo && med <= hi);
    }

    /// Dispersion statistics are non-negative.
    #[test]
    fn dispersion_non_negative(v in samples()) {
        prop_assert!(std_dev(&v) >= 0.0);
        prop_assert!(mad(&v) >= 0.0);
    }

    /// Missing samples are ignored, never counted.
    #[test]
    fn missing_samples_ignored(v in samples_with_gaps()) {
        let compact: Vec<f64> = v.iter().copied().filter(|x| !x.is_nan()).collect();
        prop_assert_eq!(count_present(&v), compact.len());
        prop_assert!(approx_eq(mean(&v), mean(&compact), TOL));
        prop_assert!(approx_eq(median(&v), median(&compact), TOL));
        prop_assert!(approx_eq(std_dev(&v), std_dev(&compact), TOL));
    }

    /// Shifting every sample shifts location and leaves dispersion alone.
    #[test]
    fn shift_equivariance(v in samples(), shift in -100.0..100.0f64) {
        let shifted: Vec<f64> = v.iter().map(|x| x + shift).collect();
        prop_assert!(approx_eq(mean(&shifted), mean(&v) + shift, 1e-6));
        prop_assert!(approx_eq(median(&shifted), median(&v) + shift, 1e-6));
        prop_assert!(approx_eq(std_dev(&shifted), std_dev(&v), 1e-6));
        prop_assert!(approx_eq(mad(&shifted), mad(&v), 1e-6));
    }

    /// Curvature is undefined exactly at the two ends.
    #[test]
    fn curvature_defined_on_interior(v in prop::collection::vec(-50.0..50.0f64, 3..40)) {
        let t = three_point_curvature(&v);
        prop_assert_eq!(t.len(), v.len());
        prop_assert!(t[0].is_nan());
        prop_assert!(t[v.len() - 1].is_nan());
        for x in &t[1..v.len() - 1] {
            prop_assert!(x.is_finite() && *x >= 0.0);
        }
    }

    /// Registry lookup returns the same function as the direct call.
    #[test]
    fn registry_matches_direct(v in samples()) {
        let registry = StatisticRegistry::with_builtins();
        prop_assert!(approx_eq(registry.apply("median", &v).unwrap(), median(&v), TOL));
        prop_assert!(approx_eq(registry.apply("std", &v).unwrap(), std_dev(&v), TOL));
    }
}
