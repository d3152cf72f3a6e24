//! Ocean QC math utilities.
//!
//! Every statistic here treats NaN as a missing sample and ignores it. A
//! statistic over zero usable samples is NaN, which makes downstream range
//! comparisons evaluate false.

pub mod stats;

pub use stats::curvature::{five_point_thresholds, three_point_curvature};
pub use stats::descriptive::*;
pub use stats::registry::{StatisticFn, StatisticRegistry, UnknownStatistic};
