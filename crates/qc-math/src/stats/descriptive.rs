//! Missing-aware descriptive statistics.
//!
//! All functions skip NaN samples. Empty input (after skipping) yields NaN.

/// Collect the finite-or-infinite, non-NaN samples.
pub fn present(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Number of non-missing samples.
pub fn count_present(samples: &[f64]) -> usize {
    samples.iter().filter(|v| !v.is_nan()).count()
}

pub fn mean(samples: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in samples.iter().filter(|v| !v.is_nan()) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample variance (n - 1 denominator). A single sample has zero variance.
pub fn variance(samples: &[f64]) -> f64 {
    let values = present(samples);
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let m = values.iter().sum::<f64>() / n as f64;
            let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
            ss / (n - 1) as f64
        }
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(samples: &[f64]) -> f64 {
    variance(samples).sqrt()
}

fn sorted_present(samples: &[f64]) -> Vec<f64> {
    let mut values = present(samples);
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

fn median_of_sorted(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub fn median(samples: &[f64]) -> f64 {
    median_of_sorted(&sorted_present(samples))
}

/// Median absolute deviation about the median (unscaled).
pub fn mad(samples: &[f64]) -> f64 {
    let values = present(samples);
    if values.is_empty() {
        return f64::NAN;
    }
    let center = median(&values);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    median_of_sorted(&deviations)
}

pub fn min(samples: &[f64]) -> f64 {
    samples
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::min)
}

pub fn max(samples: &[f64]) -> f64 {
    samples
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

/// max - min.
pub fn range(samples: &[f64]) -> f64 {
    max(samples) - min(samples)
}

/// Linearly interpolated percentile, `p` in [0, 100].
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    let values = sorted_present(samples);
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return f64::NAN;
    }
    if values.len() == 1 {
        return values[0];
    }
    let rank = p / 100.0 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    values[lo] + (values[hi] - values[lo]) * frac
}

/// Interquartile range (p75 - p25).
pub fn iqr(samples: &[f64]) -> f64 {
    percentile(samples, 75.0) - percentile(samples, 25.0)
}
