//! Per-burst outlier test.
//!
//! Within each burst a sample is good when it lies inside
//! `average ± scale * dispersion`, both statistics computed over the burst's
//! usable samples and chosen per parameter from configuration. Everything else,
//! including samples masked for an earlier bad flag and bursts with no usable
//! samples at all, is bad.

use ndarray::{s, Array2, ArrayView2};
use qc_common::{base_parameter_name, DatasetId, Error, Flag, Result};
use serde::Serialize;

use super::{
    mask_unusable, PreparedState, Preparer, QcContext, QcOutcome, QcTest, SkipReason,
};
use crate::burst::{segment_dataset, BurstRange};
use crate::dataset::{Dataset, Target, TargetKind};
use crate::logging::{event_names, Stage};

pub const NAME: &str = "burst";

/// Statistics of one burst in one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurstSummary {
    pub start_index: usize,
    pub end_index: usize,
    pub column: usize,
    /// Mean sample time, serial days.
    pub mean_time: f64,
    pub average: f64,
    /// Unscaled dispersion.
    pub dispersion: f64,
    pub threshold_min: f64,
    pub threshold_max: f64,
    /// Samples that contributed to the statistics.
    pub n_used: usize,
}

/// Per-dataset burst statistics returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurstStatistics {
    pub dataset: DatasetId,
    pub variable: String,
    pub average: String,
    pub dispersion: String,
    pub dispersion_scale: f64,
    pub bursts: Vec<BurstSummary>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BurstOutlierTest;

struct BurstPreparer;

impl Preparer for BurstPreparer {
    fn prepare(
        &self,
        dataset: &Dataset,
        _data: ArrayView2<'_, f64>,
        _index: usize,
        _kind: TargetKind,
    ) -> Result<Option<PreparedState>> {
        let bursts = segment_dataset(dataset);
        if let Some(b) = &bursts {
            tracing::debug!(
                target: event_names::SEGMENT_BURSTS,
                stage = %Stage::Segment,
                bursts = b.len(),
                message = "segmented time axis"
            );
        }
        Ok(bursts.map(PreparedState::Bursts))
    }
}

static PREPARER: BurstPreparer = BurstPreparer;

/// Parameter name under which a base parameter's dispersion scale is stored.
pub fn scale_param(base: &str) -> String {
    format!("{}_dispersion_scale", base)
}

impl QcTest for BurstOutlierTest {
    fn name(&self) -> &'static str {
        NAME
    }

    fn preparer(&self) -> Option<&dyn Preparer> {
        Some(&PREPARER)
    }

    fn eligible_targets(&self, ctx: &QcContext, dataset: &Dataset) -> Vec<Target> {
        dataset
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                ctx.config
                    .burst
                    .for_parameter(base_parameter_name(&v.name))
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
        prepared: Option<&PreparedState>,
    ) -> Result<QcOutcome> {
        let series = dataset.series(target)?;
        let base = base_parameter_name(series.name);
        let Some(spec) = ctx.config.burst.for_parameter(base) else {
            return Ok(QcOutcome::skipped(
                NAME,
                &series,
                SkipReason::NotConfigured {
                    parameter: base.to_string(),
                },
            ));
        };
        if dataset.burst_timing().is_none() {
            return Ok(QcOutcome::skipped(NAME, &series, SkipReason::NoBurstMetadata));
        }
        let bursts = match prepared {
            Some(PreparedState::Bursts(b)) => b.clone(),
            None => match segment_dataset(dataset) {
                Some(b) => b,
                None => return Ok(QcOutcome::skipped(NAME, &series, SkipReason::NoTimeAxis)),
            },
        };
        let Some(time) = dataset.time_axis() else {
            return Ok(QcOutcome::skipped(NAME, &series, SkipReason::NoTimeAxis));
        };
        let nrows = series.data.nrows();
        if time.len() != nrows {
            return Err(Error::ShapeMismatch {
                variable: series.name.to_string(),
                what: "TIME axis".to_string(),
                expected: vec![nrows],
                actual: vec![time.len()],
            });
        }

        let average_fn = ctx
            .registry
            .get(&spec.average)
            .map_err(|e| Error::UnknownStatistic(e.to_string()))?;
        let dispersion_fn = ctx
            .registry
            .get(&spec.dispersion)
            .map_err(|e| Error::UnknownStatistic(e.to_string()))?;
        let scale_key = scale_param(base);
        let scale = ctx.resolve_param(dataset, NAME, &scale_key, spec.dispersion_scale)?;

        let masked = mask_unusable(series.data, series.flags, &ctx.flag_set);
        let good = ctx.code(Flag::Good);
        // Pass 1: everything bad. Pass 2: in-band samples good.
        let mut flags = Array2::from_elem(series.data.raw_dim(), ctx.code(Flag::Bad));
        let mut summaries = Vec::with_capacity(bursts.len() * masked.ncols());

        for (col, column) in masked.columns().into_iter().enumerate() {
            for burst in &bursts {
                let summary = summarize(
                    column.slice(s![burst.start..=burst.end]).to_vec(),
                    burst,
                    col,
                    time.slice(s![burst.start..=burst.end]).to_vec(),
                    average_fn,
                    dispersion_fn,
                    scale,
                );
                for i in burst.indices() {
                    let v = column[i];
                    if v >= summary.threshold_min && v <= summary.threshold_max {
                        flags[[i, col]] = good;
                    }
                }
                summaries.push(summary);
            }
        }

        let stats = BurstStatistics {
            dataset: dataset.identity.clone(),
            variable: series.name.to_string(),
            average: spec.average.clone(),
            dispersion: spec.dispersion.clone(),
            dispersion_scale: scale,
            bursts: summaries,
        };
        let log = format!(
            "{}: average={}, dispersion={}, {}={}",
            base, spec.average, spec.dispersion, scale_key, scale
        );
        let mut outcome = QcOutcome::evaluated(NAME, &series, flags, vec![target])
            .with_params(log, vec![(scale_key, scale)]);
        outcome.burst_stats = Some(stats);
        Ok(outcome)
    }
}

fn summarize(
    values: Vec<f64>,
    burst: &BurstRange,
    column: usize,
    times: Vec<f64>,
    average_fn: qc_math::StatisticFn,
    dispersion_fn: qc_math::StatisticFn,
    scale: f64,
) -> BurstSummary {
    let average = average_fn(&values);
    let dispersion = dispersion_fn(&values);
    let half_width = scale * dispersion;
    BurstSummary {
        start_index: burst.start,
        end_index: burst.end,
        column,
        mean_time: qc_math::mean(&times),
        average,
        dispersion,
        threshold_min: average - half_width,
        threshold_max: average + half_width,
        n_used: qc_math::count_present(&values),
    }
}
