//! Curvature kernels for spike detection.

use super::descriptive::{median, std_dev};

/// Three-point curvature statistic
/// `T(n) = | |v(n) - (v(n+1) + v(n-1)) / 2| - |(v(n+1) - v(n-1)) / 2| |`.
///
/// The first and last samples have no neighbours on one side and are NaN, as
/// is any sample whose neighbourhood holds a missing value.
pub fn three_point_curvature(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n < 3 {
        return out;
    }
    for i in 1..n - 1 {
        let prev = values[i - 1];
        let next = values[i + 1];
        let bump = (values[i] - (next + prev) / 2.0).abs();
        let slope = ((next - prev) / 2.0).abs();
        out[i] = (bump - slope).abs();
    }
    out
}

/// Sliding five-sample adaptive threshold over a curvature series:
/// `|median(w)| + |std(w)|` for `w = t[n-2..=n+2]`.
///
/// The two samples at each end have an incomplete window and are NaN. Missing
/// values inside a window are skipped.
pub fn five_point_thresholds(curvature: &[f64]) -> Vec<f64> {
    let n = curvature.len();
    let mut out = vec![f64::NAN; n];
    if n < 5 {
        return out;
    }
    for i in 2..n - 2 {
        let window = &curvature[i - 2..=i + 2];
        out[i] = median(window).abs() + std_dev(window).abs();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_are_undefined() {
        let t = three_point_curvature(&[1.0, 2.0, 3.0, 4.0]);
        assert!(t[0].is_nan());
        assert!(t[3].is_nan());
    }

    #[test]
    fn linear_ramp_has_zero_curvature() {
        let t = three_point_curvature(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for v in &t[1..4] {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn isolated_spike_scores_its_height() {
        let t = three_point_curvature(&[10.0, 10.0, 20.0, 10.0, 10.0]);
        assert_eq!(t[2], 10.0);
        // neighbours see half the bump minus half the slope
        assert_eq!(t[1], 0.0);
        assert_eq!(t[3], 0.0);
    }

    #[test]
    fn short_series_all_undefined() {
        assert!(three_point_curvature(&[1.0, 2.0])
            .iter()
            .all(|v| v.is_nan()));
        assert!(five_point_thresholds(&[1.0, 2.0, 3.0, 4.0])
            .iter()
            .all(|v| v.is_nan()));
    }

    #[test]
    fn five_point_boundaries_undefined() {
        let thr = five_point_thresholds(&[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert!(thr[0].is_nan() && thr[1].is_nan());
        assert!(thr[5].is_nan() && thr[6].is_nan());
        assert!(thr[2].is_finite() && thr[3].is_finite() && thr[4].is_finite());
        // window [1,1,1,1,1] at index 3
        assert_eq!(thr[3], 1.0);
    }
}
