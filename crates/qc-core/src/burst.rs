//! Burst segmentation.
//!
//! Duty-cycled instruments sample densely for `burst_duration` seconds, then
//! idle until the next burst starts `burst_interval` seconds later. A gap of at
//! least `interval - duration` between consecutive samples therefore marks a
//! new burst.

use crate::dataset::{Dataset, SECONDS_PER_DAY};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Inclusive index range of one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstRange {
    pub start: usize,
    pub end: usize,
}

#[allow(clippy::len_without_is_empty)]
impl BurstRange {
    /// Number of samples; a burst always holds at least one.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Split a time axis (serial days) into bursts.
///
/// Sample 0 always starts a burst; sample `i` starts one iff
/// `(time[i] - time[i-1]) * 86400 >= gap_threshold`. Ranges are ordered,
/// contiguous and cover every index exactly once. An empty axis yields no
/// bursts.
pub fn segment(time_days: ArrayView1<'_, f64>, gap_threshold: f64) -> Vec<BurstRange> {
    let n = time_days.len();
    if n == 0 {
        return Vec::new();
    }
    let mut starts = vec![0usize];
    for i in 1..n {
        let gap = (time_days[i] - time_days[i - 1]) * SECONDS_PER_DAY;
        if gap >= gap_threshold {
            starts.push(i);
        }
    }
    starts
        .iter()
        .enumerate()
        .map(|(k, &start)| BurstRange {
            start,
            end: starts.get(k + 1).map(|next| next - 1).unwrap_or(n - 1),
        })
        .collect()
}

/// Segment a dataset's time axis using its burst metadata.
///
/// `None` when the dataset has no burst metadata or no TIME axis.
pub fn segment_dataset(dataset: &Dataset) -> Option<Vec<BurstRange>> {
    let (duration, interval) = dataset.burst_timing()?;
    let time = dataset.time_axis()?;
    Some(segment(time, interval - duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dimension, TIME};
    use ndarray::{arr1, Array2};

    fn seconds_to_days(secs: &[f64]) -> ndarray::Array1<f64> {
        arr1(secs).mapv(|s| s / SECONDS_PER_DAY)
    }

    #[test]
    fn splits_on_gap_threshold() {
        // 1 Hz bursts of 3 samples, one every 60 s
        let t = seconds_to_days(&[0.0, 1.0, 2.0, 60.0, 61.0, 62.0, 120.0]);
        let bursts = segment(t.view(), 60.0 - 3.0);
        assert_eq!(
            bursts,
            vec![
                BurstRange { start: 0, end: 2 },
                BurstRange { start: 3, end: 5 },
                BurstRange { start: 6, end: 6 },
            ]
        );
        assert_eq!(bursts[1].len(), 3);
    }

    #[test]
    fn gap_equal_to_threshold_starts_burst() {
        // eighth-day steps are exact in binary: 10800 s
        let t = arr1(&[0.0, 0.125, 0.25]);
        assert_eq!(segment(t.view(), 10_800.0).len(), 3);
        assert_eq!(segment(t.view(), 10_800.5).len(), 1);
    }

    #[test]
    fn no_gap_is_one_burst() {
        let t = seconds_to_days(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(segment(t.view(), 100.0), vec![BurstRange { start: 0, end: 3 }]);
    }

    #[test]
    fn empty_axis_has_no_bursts() {
        assert!(segment(arr1::<f64>(&[]).view(), 1.0).is_empty());
    }

    #[test]
    fn dataset_without_metadata_or_time_is_skipped() {
        let mut ds = Dataset::new("x");
        assert!(segment_dataset(&ds).is_none());

        ds.burst_duration = Some(2.0);
        ds.burst_interval = Some(60.0);
        assert!(segment_dataset(&ds).is_none());

        ds.dimensions.push(Dimension {
            name: TIME.to_string(),
            data: seconds_to_days(&[0.0, 1.0, 60.0])
                .into_shape_with_order((3, 1))
                .unwrap(),
            flags: Array2::zeros((3, 1)),
        });
        assert_eq!(segment_dataset(&ds).unwrap().len(), 2);
    }
}
