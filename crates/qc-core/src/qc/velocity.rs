//! Multi-beam velocity diagnostic tests.
//!
//! An acoustic current profiler reports four per-beam diagnostic channels
//! next to the velocities derived from them. Each test here votes across the
//! beams cell by cell and writes the same good/bad verdict onto every derived
//! velocity variable present.

use ndarray::{Array2, Array3, ArrayView3, Axis};
use qc_common::{Error, Flag, Result};
use qc_config::VelocityConfig;

use super::{PreparedState, QcContext, QcOutcome, QcTest, SkipReason};
use crate::dataset::{Dataset, Target};

/// Number of physical beams.
pub const BEAMS: usize = 4;

/// Variables computed from the beam velocities; all receive the verdict.
pub const DERIVED_VARIABLES: [&str; 8] = [
    "UCUR", "VCUR", "WCUR", "CSPD", "CDIR", "UCUR_MAG", "VCUR_MAG", "CDIR_MAG",
];

/// The diagnostic a [`MultiBeamTest`] votes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamDiagnostic {
    /// Pass when at least two beams' correlation exceeds `cmag`.
    CorrelationMagnitude,
    /// Pass when 3-beam plus 4-beam solution percentages exceed `min_pgood`.
    PercentGood,
    /// Fail on excessive inter-beam echo intensity spread.
    EchoRange,
}

impl BeamDiagnostic {
    pub const ALL: [BeamDiagnostic; 3] = [
        BeamDiagnostic::CorrelationMagnitude,
        BeamDiagnostic::PercentGood,
        BeamDiagnostic::EchoRange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BeamDiagnostic::CorrelationMagnitude => "correlation_magnitude",
            BeamDiagnostic::PercentGood => "percent_good",
            BeamDiagnostic::EchoRange => "echo_range",
        }
    }

    pub fn channel_prefix(self) -> &'static str {
        match self {
            BeamDiagnostic::CorrelationMagnitude => "CMAG",
            BeamDiagnostic::PercentGood => "PERG",
            BeamDiagnostic::EchoRange => "ABSIC",
        }
    }

    /// Channel names, beam 1 first.
    pub fn channels(self) -> Vec<String> {
        (1..=BEAMS)
            .map(|b| format!("{}{}", self.channel_prefix(), b))
            .collect()
    }

    /// Name of the threshold parameter.
    pub fn param(self) -> &'static str {
        match self {
            BeamDiagnostic::CorrelationMagnitude => "cmag",
            BeamDiagnostic::PercentGood => "min_pgood",
            BeamDiagnostic::EchoRange => "ea_thresh",
        }
    }

    pub fn default_threshold(self, config: &VelocityConfig) -> f64 {
        match self {
            BeamDiagnostic::CorrelationMagnitude => config.correlation_magnitude.cmag,
            BeamDiagnostic::PercentGood => config.percent_good.min_pgood,
            BeamDiagnostic::EchoRange => config.echo_range.ea_thresh,
        }
    }
}

/// One of the three beam-voting tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiBeamTest {
    pub diagnostic: BeamDiagnostic,
}

impl MultiBeamTest {
    pub fn new(diagnostic: BeamDiagnostic) -> Self {
        Self { diagnostic }
    }

    pub fn correlation_magnitude() -> Self {
        Self::new(BeamDiagnostic::CorrelationMagnitude)
    }

    pub fn percent_good() -> Self {
        Self::new(BeamDiagnostic::PercentGood)
    }

    pub fn echo_range() -> Self {
        Self::new(BeamDiagnostic::EchoRange)
    }
}

/// Derived velocity variables present in `dataset`, in table order.
pub fn derived_targets(dataset: &Dataset) -> Vec<Target> {
    DERIVED_VARIABLES
        .iter()
        .filter_map(|name| dataset.variable_index(name).map(Target::variable))
        .collect()
}

/// Stack the four channels into `beam × sample × bin`.
fn stack_channels(dataset: &Dataset, names: &[String]) -> Result<Array3<f64>> {
    let mut views = Vec::with_capacity(names.len());
    for name in names {
        let var = dataset
            .variable(name)
            .ok_or_else(|| Error::MissingField(name.clone()))?;
        views.push((name, var.data.view()));
    }
    let (first_name, first) = views[0];
    let shape = first.dim();
    for (name, view) in &views[1..] {
        if view.dim() != shape {
            return Err(Error::ShapeMismatch {
                variable: name.to_string(),
                what: format!("beam channel vs {}", first_name),
                expected: vec![shape.0, shape.1],
                actual: view.shape().to_vec(),
            });
        }
    }
    let mut stacked = Array3::from_elem((names.len(), shape.0, shape.1), f64::NAN);
    for (beam, (_, view)) in views.iter().enumerate() {
        stacked.index_axis_mut(Axis(0), beam).assign(view);
    }
    Ok(stacked)
}

/// Cells where at least two beams exceed `threshold`.
pub fn correlation_vote(beams: ArrayView3<'_, f64>, threshold: f64) -> Array2<bool> {
    let (_, samples, bins) = beams.dim();
    Array2::from_shape_fn((samples, bins), |(i, j)| {
        beams
            .slice(ndarray::s![.., i, j])
            .iter()
            .filter(|&&v| v > threshold)
            .count()
            >= 2
    })
}

/// Cells where beam 1 (3-beam solutions) plus beam 4 (4-beam solutions)
/// exceeds `threshold`.
pub fn percent_good_vote(beams: ArrayView3<'_, f64>, threshold: f64) -> Array2<bool> {
    let (_, samples, bins) = beams.dim();
    let last = beams.len_of(Axis(0)) - 1;
    Array2::from_shape_fn((samples, bins), |(i, j)| {
        beams[[0, i, j]] + beams[[last, i, j]] > threshold
    })
}

/// Echo intensity spread test.
///
/// Per cell the beams are sorted ascending. In earth coordinates a spread
/// `highest - lowest` above `threshold` fails the highest beam's cell only.
/// In any frame `highest - second lowest` above `threshold` fails the cell on
/// every beam. The verdict is beam 1's state.
pub fn echo_range_vote(
    beams: ArrayView3<'_, f64>,
    threshold: f64,
    earth_coordinates: bool,
) -> Array2<bool> {
    let (n_beams, samples, bins) = beams.dim();
    let mut failed = Array3::from_elem((n_beams, samples, bins), false);
    for i in 0..samples {
        for j in 0..bins {
            let mut order: Vec<(usize, f64)> =
                (0..n_beams).map(|b| (b, beams[[b, i, j]])).collect();
            order.sort_by(|a, b| a.1.total_cmp(&b.1));
            let (highest_beam, highest) = order[n_beams - 1];
            let lowest = order[0].1;
            let second_lowest = order[1.min(n_beams - 1)].1;

            if earth_coordinates && highest - lowest > threshold {
                failed[[highest_beam, i, j]] = true;
            }
            if highest - second_lowest > threshold {
                for b in 0..n_beams {
                    failed[[b, i, j]] = true;
                }
            }
        }
    }
    failed.index_axis(Axis(0), 0).mapv(|f| !f)
}

impl QcTest for MultiBeamTest {
    fn name(&self) -> &'static str {
        self.diagnostic.name()
    }

    fn eligible_targets(&self, _ctx: &QcContext, dataset: &Dataset) -> Vec<Target> {
        // one invocation covers every derived variable
        derived_targets(dataset).into_iter().take(1).collect()
    }

    fn evaluate(
        &self,
        ctx: &QcContext,
        dataset: &Dataset,
        target: Target,
        _prepared: Option<&PreparedState>,
    ) -> Result<QcOutcome> {
        let series = dataset.series(target)?;
        let name = self.diagnostic.name();

        let channels = self.diagnostic.channels();
        let missing: Vec<String> = channels
            .iter()
            .filter(|c| dataset.variable(c).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Ok(QcOutcome::skipped(
                name,
                &series,
                SkipReason::MissingChannels { missing },
            ));
        }
        let targets = derived_targets(dataset);
        if targets.is_empty() {
            return Ok(QcOutcome::skipped(name, &series, SkipReason::NoDerivedVariables));
        }

        let beams = stack_channels(dataset, &channels)?;
        let cells = [beams.len_of(Axis(1)), beams.len_of(Axis(2))];
        for &t in &targets {
            let derived = dataset.series(t)?;
            if derived.data.shape() != cells {
                return Err(Error::ShapeMismatch {
                    variable: derived.name.to_string(),
                    what: format!("{} beam channels", self.diagnostic.channel_prefix()),
                    expected: cells.to_vec(),
                    actual: derived.data.shape().to_vec(),
                });
            }
        }

        let param = self.diagnostic.param();
        let threshold = ctx.resolve_param(
            dataset,
            name,
            param,
            self.diagnostic.default_threshold(&ctx.config.velocity),
        )?;

        let pass = match self.diagnostic {
            BeamDiagnostic::CorrelationMagnitude => correlation_vote(beams.view(), threshold),
            BeamDiagnostic::PercentGood => percent_good_vote(beams.view(), threshold),
            BeamDiagnostic::EchoRange => echo_range_vote(
                beams.view(),
                threshold,
                dataset.instrument.is_earth_coordinates(),
            ),
        };
        let good = ctx.code(Flag::Good);
        let bad = ctx.code(Flag::Bad);
        let flags = pass.mapv(|ok| if ok { good } else { bad });

        Ok(QcOutcome::evaluated(name, &series, flags, targets)
            .with_params(format!("{}={}", param, threshold), vec![(param.to_string(), threshold)]))
    }
}
