//! Spike test on the three-point curvature statistic.
//!
//! Only variables listed in the spike table are tested. Samples whose
//! curvature or threshold is undefined (series ends, missing neighbours,
//! incomplete five-point windows) stay raw.

use ndarray::{Array2, ArrayView2};
use qc_common::{base_parameter_name, Flag, Result};
use qc_config::{PressureDependentThreshold, SpikeThreshold};
use qc_math::{five_point_thresholds, three_point_curvature};

use super::{PreparedState, QcContext, QcOutcome, QcTest, SkipReason};
use crate::dataset::{Dataset, Target};

pub const NAME: &str = "spike";

#[derive(Debug, Default, Clone, Copy)]
pub struct SpikeTest;

/// Threshold rule after parameter resolution.
#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Constant(f64),
    Pressure {
        shallow: f64,
        deep: f64,
        split_dbar: f64,
    },
    FivePoint,
}

/// First pressure-like series with the target's sample count and at least
/// one column.
fn find_pressure<'a>(
    dataset: &'a Dataset,
    spec: &PressureDependentThreshold,
    samples: usize,
) -> Option<ArrayView2<'a, f64>> {
    spec.pressure_variables
        .iter()
        .filter_map(|name| dataset.find(name))
        .filter_map(|t| dataset.series(t).ok())
        .map(|s| s.data)
        .find(|data| data.nrows() == samples && data.ncols() > 0)
}

/// Pressure at `(row, col)`: per cell when the shapes agree, else the first column.
fn pressure_at(pressure: Option<&ArrayView2<'_, f64>>, row: usize, col: usize) -> f64 {
    match pressure {
        Some(p) if col < p.ncols() => p[[row, col]],
        Some(p) => p[[row, 0]],
        None => f64::NAN,
    }
}

impl QcTest for SpikeTest {
    fn name(&self) -> &'static str {
        NAME
    }

    fn eligible_targets(&self, ctx: &QcContext, dataset: &Dataset) -> Vec<Target> {
        dataset
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                ctx.config
                    .spike
                    .for_variable(base_parameter_name(&v.name))
                    .is_some()
            })
            .map(|(i, _)| Target::variable(i))
            .collect()
    }

    fn evaluate(
        &self,
        ctx: &QcContext,
        dataset: &Dataset,
        target: Target,
        _prepared: Option<&PreparedState>,
    ) -> Result<QcOutcome> {
        let series = dataset.series(target)?;
        let base = base_parameter_name(series.name);
        let Some(threshold) = ctx.config.spike.for_variable(base) else {
            return Ok(QcOutcome::skipped(
                NAME,
                &series,
                SkipReason::NotConfigured {
                    parameter: base.to_string(),
                },
            ));
        };

        let mut params = Vec::new();
        let mut pressure = None;
        let rule = match threshold {
            SpikeThreshold::Constant(v) => {
                let key = format!("{}_threshold", base);
                let v = ctx.resolve_param(dataset, NAME, &key, *v)?;
                params.push((key, v));
                Rule::Constant(v)
            }
            SpikeThreshold::PressureDependent(spec) => {
                let shallow_key = format!("{}_shallow", base);
                let deep_key = format!("{}_deep", base);
                let shallow = ctx.resolve_param(dataset, NAME, &shallow_key, spec.shallow)?;
                let deep = ctx.resolve_param(dataset, NAME, &deep_key, spec.deep)?;
                params.push((shallow_key, shallow));
                params.push((deep_key, deep));
                pressure = find_pressure(dataset, spec, series.data.nrows());
                if pressure.is_none() {
                    tracing::debug!(
                        variable = series.name,
                        "no pressure series found, using shallow threshold"
                    );
                }
                Rule::Pressure {
                    shallow,
                    deep,
                    split_dbar: spec.split_dbar,
                }
            }
            SpikeThreshold::FivePointAggregate => Rule::FivePoint,
        };

        let good = ctx.code(Flag::Good);
        let bad = ctx.code(Flag::Bad);
        let mut flags = Array2::from_elem(series.data.raw_dim(), ctx.code(Flag::Raw));

        for (col, column) in series.data.columns().into_iter().enumerate() {
            let curvature = three_point_curvature(&column.to_vec());
            let adaptive = match rule {
                Rule::FivePoint => Some(five_point_thresholds(&curvature)),
                _ => None,
            };
            for (row, &t) in curvature.iter().enumerate() {
                let limit = match (&rule, &adaptive) {
                    (Rule::Constant(v), _) => *v,
                    (
                        Rule::Pressure {
                            shallow,
                            deep,
                            split_dbar,
                        },
                        _,
                    ) => {
                        if pressure_at(pressure.as_ref(), row, col) >= *split_dbar {
                            *deep
                        } else {
                            *shallow
                        }
                    }
                    (Rule::FivePoint, Some(limits)) => limits[row],
                    (Rule::FivePoint, None) => f64::NAN,
                };
                if t.is_nan() || limit.is_nan() {
                    continue;
                }
                flags[[row, col]] = if t <= limit { good } else { bad };
            }
        }

        let mut log = format!("{}: mode={}", base, threshold.mode_name());
        for (key, value) in &params {
            log.push_str(&format!(", {}={}", key, value));
        }
        Ok(QcOutcome::evaluated(NAME, &series, flags, vec![target]).with_params(log, params))
    }
}
