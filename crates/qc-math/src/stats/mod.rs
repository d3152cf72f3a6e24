//! Statistic kernels.

pub mod curvature;
pub mod descriptive;
pub mod registry;
