//! QC test framework.
//!
//! Each test implements [`QcTest`]: given a dataset and a [`Target`] series it
//! returns a [`QcOutcome`] holding a flag array and the series it applies to.
//! [`run_test`] drives one invocation end to end:
//!
//! 1. If the test offers a [`Preparer`], precompute its state (bursts).
//! 2. Evaluate. Numeric parameters resolve as explicit override, then stored
//!    override, then configured default.
//! 3. Unless the test skipped, merge flags into every target and persist the
//!    effective parameters.
//!
//! A skipped test changes nothing and logs nothing.

pub mod apply;
pub mod burst_outlier;
pub mod registry;
pub mod spike;
pub mod velocity;

pub use apply::{apply_flags, mask_unusable};
pub use burst_outlier::{BurstOutlierTest, BurstStatistics, BurstSummary};
pub use registry::{by_name, TEST_NAMES};
pub use spike::SpikeTest;
pub use velocity::{BeamDiagnostic, MultiBeamTest};

use crate::burst::BurstRange;
use crate::dataset::{Dataset, Series, Target, TargetKind};
use crate::logging::{event_names, Stage};
use crate::overrides::OverrideStore;
use ndarray::{Array2, ArrayView2};
use qc_common::{Flag, FlagCode, FlagSet, Result};
use qc_config::QcConfig;
use qc_math::StatisticRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caller-supplied parameter values: test -> parameter -> value.
pub type ExplicitOverrides = BTreeMap<String, BTreeMap<String, f64>>;

/// Interactive confirmation of a numeric parameter before a test runs.
pub trait ParameterPrompt: Send + Sync {
    /// Return the value to use; returning `proposed` accepts it.
    fn confirm(&self, test: &str, param: &str, proposed: f64) -> f64;
}

/// Why a test did not evaluate its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No burst duration/interval metadata.
    NoBurstMetadata,
    /// No TIME dimension or variable.
    NoTimeAxis,
    /// The parameter has no entry in this test's configuration table.
    NotConfigured { parameter: String },
    /// Required per-beam diagnostic channels are absent.
    MissingChannels { missing: Vec<String> },
    /// None of the derived velocity variables is present.
    NoDerivedVariables,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoBurstMetadata => write!(f, "no burst metadata"),
            SkipReason::NoTimeAxis => write!(f, "no TIME axis"),
            SkipReason::NotConfigured { parameter } => {
                write!(f, "{} is not configured for this test", parameter)
            }
            SkipReason::MissingChannels { missing } => {
                write!(f, "missing channels: {}", missing.join(", "))
            }
            SkipReason::NoDerivedVariables => write!(f, "no derived velocity variables"),
        }
    }
}

/// State a [`Preparer`] computes once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedState {
    Bursts(Vec<BurstRange>),
}

/// Optional capability: precompute state before evaluation.
pub trait Preparer: Send + Sync {
    /// `Ok(None)` when there is nothing to prepare (the test will skip).
    fn prepare(
        &self,
        dataset: &Dataset,
        data: ArrayView2<'_, f64>,
        index: usize,
        kind: TargetKind,
    ) -> Result<Option<PreparedState>>;
}

/// Counts of each flag in an outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlagCounts {
    pub raw: usize,
    pub good: usize,
    pub probably_good: usize,
    pub probably_bad: usize,
    pub bad: usize,
}

impl FlagCounts {
    pub fn tally(flags: ArrayView2<'_, FlagCode>, flag_set: &FlagSet) -> Self {
        let mut counts = FlagCounts::default();
        for &code in flags.iter() {
            match flag_set.decode(code).unwrap_or(Flag::Raw) {
                Flag::Raw => counts.raw += 1,
                Flag::Good => counts.good += 1,
                Flag::ProbablyGood => counts.probably_good += 1,
                Flag::ProbablyBad => counts.probably_bad += 1,
                Flag::Bad => counts.bad += 1,
            }
        }
        counts
    }
}

/// Result of one test invocation.
#[derive(Debug, Clone)]
pub struct QcOutcome {
    pub test: &'static str,
    /// Name of the invoked target series.
    pub variable: String,
    /// The target's data, untouched.
    pub data: Array2<f64>,
    /// `None` when skipped.
    pub flags: Option<Array2<FlagCode>>,
    /// Series that receive `flags`.
    pub targets: Vec<Target>,
    /// Effective parameters, for audit trails (`"cmag=64"`).
    pub param_log: String,
    /// Numeric parameters to persist in the override store.
    pub params: Vec<(String, f64)>,
    pub burst_stats: Option<BurstStatistics>,
    pub skipped: Option<SkipReason>,
}

impl QcOutcome {
    pub fn evaluated(
        test: &'static str,
        series: &Series<'_>,
        flags: Array2<FlagCode>,
        targets: Vec<Target>,
    ) -> Self {
        QcOutcome {
            test,
            variable: series.name.to_string(),
            data: series.data.to_owned(),
            flags: Some(flags),
            targets,
            param_log: String::new(),
            params: Vec::new(),
            burst_stats: None,
            skipped: None,
        }
    }

    pub fn skipped(test: &'static str, series: &Series<'_>, reason: SkipReason) -> Self {
        QcOutcome {
            test,
            variable: series.name.to_string(),
            data: series.data.to_owned(),
            flags: None,
            targets: Vec::new(),
            param_log: String::new(),
            params: Vec::new(),
            burst_stats: None,
            skipped: Some(reason),
        }
    }

    pub fn with_params(mut self, param_log: String, params: Vec<(String, f64)>) -> Self {
        self.param_log = param_log;
        self.params = params;
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub fn counts(&self, flag_set: &FlagSet) -> FlagCounts {
        self.flags
            .as_ref()
            .map(|f| FlagCounts::tally(f.view(), flag_set))
            .unwrap_or_default()
    }
}

/// A QC test.
pub trait QcTest: Send + Sync {
    /// Canonical name; keys configuration and stored overrides.
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        ctx: &QcContext,
        dataset: &Dataset,
        target: Target,
        prepared: Option<&PreparedState>,
    ) -> Result<QcOutcome>;

    fn preparer(&self) -> Option<&dyn Preparer> {
        None
    }

    /// Targets worth invoking when the caller names none.
    fn eligible_targets(&self, _ctx: &QcContext, dataset: &Dataset) -> Vec<Target> {
        (0..dataset.variables.len()).map(Target::variable).collect()
    }
}

/// Everything a test needs besides the dataset.
pub struct QcContext {
    pub config: QcConfig,
    pub flag_set: FlagSet,
    pub registry: StatisticRegistry,
    pub override_store: Option<Arc<OverrideStore>>,
    pub explicit_overrides: ExplicitOverrides,
    /// Batch mode: never prompt.
    pub auto_mode: bool,
    pub prompt: Option<Box<dyn ParameterPrompt>>,
}

impl std::fmt::Debug for QcContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QcContext")
            .field("flag_set", &self.flag_set.name)
            .field("override_store", &self.override_store)
            .field("explicit_overrides", &self.explicit_overrides)
            .field("auto_mode", &self.auto_mode)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl QcContext {
    /// Automatic-mode context over `config` with the built-in statistics.
    pub fn new(config: QcConfig) -> Result<Self> {
        let flag_set = config
            .flag_set
            .build()
            .map_err(|e| qc_common::Error::InvalidFlagSet(e.to_string()))?;
        Ok(QcContext {
            config,
            flag_set,
            registry: StatisticRegistry::with_builtins(),
            override_store: None,
            explicit_overrides: BTreeMap::new(),
            auto_mode: true,
            prompt: None,
        })
    }

    pub fn with_registry(mut self, registry: StatisticRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_override_store(mut self, store: Arc<OverrideStore>) -> Self {
        self.override_store = Some(store);
        self
    }

    /// Pin a parameter for this session, ahead of stored overrides.
    pub fn with_explicit(mut self, test: &str, param: &str, value: f64) -> Self {
        self.explicit_overrides
            .entry(test.to_string())
            .or_default()
            .insert(param.to_string(), value);
        self
    }

    /// Leave automatic mode and confirm parameters through `prompt`.
    pub fn interactive(mut self, prompt: Box<dyn ParameterPrompt>) -> Self {
        self.auto_mode = false;
        self.prompt = Some(prompt);
        self
    }

    pub fn code(&self, flag: Flag) -> FlagCode {
        self.flag_set.resolve(flag)
    }

    /// Effective value of a numeric parameter.
    pub fn resolve_param(
        &self,
        dataset: &Dataset,
        test: &str,
        param: &str,
        default: f64,
    ) -> Result<f64> {
        let explicit = self
            .explicit_overrides
            .get(test)
            .and_then(|p| p.get(param))
            .copied();
        let value = match (explicit, &self.override_store) {
            (Some(v), _) => v,
            (None, Some(store)) => store.read(&dataset.identity, test, param, default)?,
            (None, None) => default,
        };

        if self.auto_mode {
            return Ok(value);
        }
        match &self.prompt {
            Some(prompt) => {
                let confirmed = prompt.confirm(test, param, value);
                if confirmed != value {
                    tracing::info!(
                        target: event_names::PARAM_PROMPTED,
                        stage = %Stage::Evaluate,
                        test,
                        param,
                        proposed = value,
                        confirmed,
                        message = "parameter changed at prompt"
                    );
                }
                Ok(confirmed)
            }
            None => Ok(value),
        }
    }

    /// Merge effective parameters into the dataset's override record.
    pub fn persist_params(
        &self,
        dataset: &Dataset,
        test: &str,
        params: &[(String, f64)],
    ) -> Result<()> {
        let Some(store) = &self.override_store else {
            return Ok(());
        };
        if params.is_empty() {
            return Ok(());
        }
        store.write_many(&dataset.identity, test, params)?;
        tracing::debug!(
            target: event_names::OVERRIDE_WRITTEN,
            stage = %Stage::Persist,
            test,
            count = params.len(),
            message = "stored effective parameters"
        );
        Ok(())
    }
}

/// Run one test against one target and write its flags into the dataset.
///
/// Every target's flag shape is checked and the effective parameters are
/// persisted before any flag is written, so on `Err` the dataset is left
/// untouched.
pub fn run_test(
    test: &dyn QcTest,
    ctx: &QcContext,
    dataset: &mut Dataset,
    target: Target,
) -> Result<QcOutcome> {
    let prepared = match test.preparer() {
        Some(preparer) => {
            let series = dataset.series(target)?;
            preparer.prepare(dataset, series.data, target.index, target.kind)?
        }
        None => None,
    };

    let outcome = test.evaluate(ctx, dataset, target, prepared.as_ref())?;
    let Some(flags) = outcome.flags.as_ref().filter(|_| !outcome.is_skipped()) else {
        return Ok(outcome);
    };

    let mut names = Vec::with_capacity(outcome.targets.len());
    for &t in &outcome.targets {
        let series = dataset.series(t)?;
        if series.flags.shape() != flags.shape() {
            return Err(qc_common::Error::ShapeMismatch {
                variable: series.name.to_string(),
                what: "test flags".to_string(),
                expected: series.flags.shape().to_vec(),
                actual: flags.shape().to_vec(),
            });
        }
        names.push(series.name.to_string());
    }

    ctx.persist_params(dataset, test.name(), &outcome.params)?;

    let mut changed = 0usize;
    for (&t, name) in outcome.targets.iter().zip(&names) {
        changed += apply_flags(name, dataset.flags_mut(t)?, flags.view(), &ctx.flag_set)?;
    }

    let counts = outcome.counts(&ctx.flag_set);
    tracing::info!(
        target: event_names::TEST_FINISHED,
        stage = %Stage::Apply,
        test = test.name(),
        variable = %outcome.variable,
        params = %outcome.param_log,
        targets = outcome.targets.len(),
        good = counts.good,
        bad = counts.bad,
        raw = counts.raw,
        changed,
        message = "test applied"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dimension, Variable, TIME};
    use ndarray::array;

    /// Flags every sample bad except the first, which stays raw.
    struct Condemn;

    impl QcTest for Condemn {
        fn name(&self) -> &'static str {
            "condemn"
        }

        fn evaluate(
            &self,
            ctx: &QcContext,
            dataset: &Dataset,
            target: Target,
            _prepared: Option<&PreparedState>,
        ) -> Result<QcOutcome> {
            let series = dataset.series(target)?;
            let level = ctx.resolve_param(dataset, self.name(), "level", 1.0)?;
            let mut flags = Array2::from_elem(series.data.raw_dim(), ctx.code(Flag::Bad));
            flags[[0, 0]] = ctx.code(Flag::Raw);
            Ok(QcOutcome::evaluated(self.name(), &series, flags, vec![target])
                .with_params(format!("level={}", level), vec![("level".into(), level)]))
        }
    }

    struct Halve;

    impl ParameterPrompt for Halve {
        fn confirm(&self, _test: &str, _param: &str, proposed: f64) -> f64 {
            proposed / 2.0
        }
    }

    fn dataset() -> Dataset {
        let mut ds = Dataset::new("framework.json");
        ds.dimensions.push(Dimension {
            name: TIME.into(),
            data: array![[1.0], [2.0], [3.0]],
            flags: Array2::zeros((3, 1)),
        });
        ds.variables.push(Variable {
            name: "TEMP".into(),
            dimensions: vec![0],
            data: array![[1.0], [2.0], [3.0]],
            flags: array![[1], [1], [1]],
        });
        ds
    }

    #[test]
    fn run_test_applies_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(OverrideStore::new(dir.path()));
        let ctx = QcContext::new(QcConfig::default())
            .unwrap()
            .with_override_store(store.clone());
        let mut ds = dataset();

        let outcome = run_test(&Condemn, &ctx, &mut ds, Target::variable(0)).unwrap();
        assert_eq!(outcome.param_log, "level=1");
        assert_eq!(ds.variables[0].flags, array![[1i8], [4], [4]]);
        assert_eq!(store.read(&ds.identity, "condemn", "level", 0.0).unwrap(), 1.0);
    }

    #[test]
    fn failed_persist_leaves_flags_untouched() {
        // a regular file where the store directory should be
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let store = Arc::new(OverrideStore::new(blocker.path()));
        let ctx = QcContext::new(QcConfig::default())
            .unwrap()
            .with_override_store(store)
            .with_explicit("condemn", "level", 2.0);
        let mut ds = dataset();

        assert!(run_test(&Condemn, &ctx, &mut ds, Target::variable(0)).is_err());
        assert_eq!(ds.variables[0].flags, array![[1i8], [1], [1]]);
    }

    #[test]
    fn explicit_beats_stored_beats_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(OverrideStore::new(dir.path()));
        let ds = dataset();
        store.write(&ds.identity, "condemn", "level", 3.0).unwrap();

        let ctx = QcContext::new(QcConfig::default())
            .unwrap()
            .with_override_store(store.clone());
        assert_eq!(ctx.resolve_param(&ds, "condemn", "level", 1.0).unwrap(), 3.0);

        let ctx = ctx.with_explicit("condemn", "level", 7.0);
        assert_eq!(ctx.resolve_param(&ds, "condemn", "level", 1.0).unwrap(), 7.0);

        let bare = QcContext::new(QcConfig::default()).unwrap();
        assert_eq!(bare.resolve_param(&ds, "condemn", "level", 1.0).unwrap(), 1.0);
    }

    #[test]
    fn prompt_only_consulted_outside_auto_mode() {
        let ds = dataset();
        let mut ctx = QcContext::new(QcConfig::default()).unwrap();
        ctx.prompt = Some(Box::new(Halve));
        assert_eq!(ctx.resolve_param(&ds, "condemn", "level", 8.0).unwrap(), 8.0);

        let ctx = QcContext::new(QcConfig::default())
            .unwrap()
            .interactive(Box::new(Halve));
        assert_eq!(ctx.resolve_param(&ds, "condemn", "level", 8.0).unwrap(), 4.0);
    }

    #[test]
    fn out_of_range_target_fails_before_evaluation() {
        let ctx = QcContext::new(QcConfig::default()).unwrap();
        let mut ds = dataset();
        let err = run_test(&Condemn, &ctx, &mut ds, Target::dimension(4)).unwrap_err();
        assert!(matches!(err, qc_common::Error::IndexOutOfRange { .. }));
    }

    #[test]
    fn counts_tally_by_flag() {
        let set = FlagSet::imos();
        let flags = array![[0i8, 1], [4, 4]];
        let counts = FlagCounts::tally(flags.view(), &set);
        assert_eq!(counts.raw, 1);
        assert_eq!(counts.good, 1);
        assert_eq!(counts.bad, 2);
    }
}
