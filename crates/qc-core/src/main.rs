//! Ocean QC Core - flag computation CLI
//!
//! The main entry point for qc-core, handling:
//! - Running QC tests over JSON datasets
//! - Inspecting and resetting persisted parameter overrides
//! - Showing and validating configuration

use clap::{Args, Parser, Subcommand};
use qc_common::error::{format_error_human, BatchResult, StructuredError};
use qc_common::{DatasetId, Error, OutputFormat, SCHEMA_VERSION};
use qc_config::resolve::default_overrides_dir;
use qc_config::{load_config, LoadedConfig, ValidationError};
use qc_core::dataset::{load_dataset, save_dataset, Dataset, Target};
use qc_core::exit_codes::ExitCode;
use qc_core::log_event;
use qc_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use qc_core::overrides::OverrideStore;
use qc_core::qc::{
    by_name, run_test, BurstStatistics, FlagCounts, ParameterPrompt, QcContext, QcTest,
    SkipReason, TEST_NAMES,
};
use qc_math::StatisticRegistry;
use regex::Regex;
use serde::Serialize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ocean QC Core - automated quality-control flagging of oceanographic data
#[derive(Parser)]
#[command(name = "qc-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to qc.json (otherwise QC_CONFIG, QC_CONFIG_DIR, XDG, /etc, defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run QC tests over one or more datasets
    Run(RunArgs),

    /// Inspect or reset persisted parameter overrides
    Overrides(OverridesArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct RunArgs {
    /// Dataset JSON files; each is processed independently
    #[arg(long = "dataset", required = true, num_args = 1..)]
    datasets: Vec<PathBuf>,

    /// Tests to run, in order (default: all)
    #[arg(long = "test", value_delimiter = ',')]
    tests: Vec<String>,

    /// Variables to test (default: every variable the test applies to)
    #[arg(long = "variable", value_delimiter = ',')]
    variables: Vec<String>,

    /// Pin a parameter for this run, e.g. correlation_magnitude.cmag=110
    #[arg(long = "set", value_name = "TEST.PARAM=VALUE")]
    sets: Vec<String>,

    /// Confirm each numeric parameter on stdin before it is used
    #[arg(long)]
    interactive: bool,

    /// Where to write the flagged dataset (single dataset only; default: in place)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not write datasets back
    #[arg(long, conflicts_with = "output")]
    no_write: bool,

    /// Override store directory
    #[arg(long, env = "QC_OVERRIDES_DIR")]
    overrides_dir: Option<PathBuf>,

    /// Neither read nor write stored overrides
    #[arg(long)]
    no_overrides: bool,
}

#[derive(Args, Debug)]
struct OverridesArgs {
    #[command(subcommand)]
    command: OverridesCommands,

    /// Override store directory
    #[arg(long, global = true, env = "QC_OVERRIDES_DIR")]
    overrides_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum OverridesCommands {
    /// Print the stored record for a dataset
    Show {
        /// Dataset identity (the `identity` field, or the dataset's path)
        #[arg(long)]
        dataset_id: String,
    },
    /// Forget stored parameters for a dataset
    ///
    /// A lock file left by a crashed writer is removed once it is older than
    /// 30 seconds.
    Reset {
        #[arg(long)]
        dataset_id: String,

        /// Only this test's parameters
        #[arg(long)]
        test: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate a configuration file
    Validate {
        /// Path to qc.json (default: the resolved configuration)
        path: Option<PathBuf>,
    },
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let cli_level = cli.global.log_level.or(if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    });
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Run(args) => run_qc(&cli.global, args),
        Commands::Overrides(args) => run_overrides(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// run
// ============================================================================

/// Reads confirmations from stdin; an empty line accepts the proposal.
struct StdinPrompt;

impl ParameterPrompt for StdinPrompt {
    fn confirm(&self, test: &str, param: &str, proposed: f64) -> f64 {
        eprint!("{}.{} [{}]: ", test, param, proposed);
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return proposed;
        }
        let line = line.trim();
        if line.is_empty() {
            return proposed;
        }
        match line.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                eprintln!("  not a number, keeping {}", proposed);
                proposed
            }
        }
    }
}

/// One `--set` assignment.
#[derive(Debug, Clone, PartialEq)]
struct ParamAssignment {
    test: String,
    param: String,
    value: f64,
}

fn parse_assignment(pattern: &Regex, raw: &str) -> Result<ParamAssignment, String> {
    let caps = pattern
        .captures(raw.trim())
        .ok_or_else(|| format!("expected TEST.PARAM=VALUE, got '{}'", raw))?;
    let test = caps[1].to_string();
    if !TEST_NAMES.contains(&test.as_str()) {
        return Err(format!(
            "unknown test '{}' (known: {})",
            test,
            TEST_NAMES.join(", ")
        ));
    }
    let value: f64 = caps[3]
        .parse()
        .map_err(|_| format!("'{}' is not a number", &caps[3]))?;
    if !value.is_finite() {
        return Err(format!("{} must be finite", &caps[0]));
    }
    Ok(ParamAssignment {
        test,
        param: caps[2].to_string(),
        value,
    })
}

fn assignment_pattern() -> Regex {
    Regex::new(r"^([a-z_]+)\.([A-Za-z0-9_]+)=(.+)$").expect("static regex")
}

/// Per-invocation record for the run summary.
#[derive(Debug, Serialize)]
struct OutcomeSummary {
    test: &'static str,
    variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "String::is_empty")]
    params: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<FlagCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    burst_stats: Option<BurstStatistics>,
}

#[derive(Debug, Serialize)]
struct DatasetSummary {
    path: String,
    identity: DatasetId,
    outcomes: Vec<OutcomeSummary>,
    flags_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<String>,
}

fn run_qc(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let log_ctx = LogContext::new(generate_run_id());
    log_event!(log_ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting QC run");

    if args.output.is_some() && args.datasets.len() > 1 {
        return output_args_error(global, "--output needs exactly one --dataset");
    }

    let test_names: Vec<String> = if args.tests.is_empty() {
        TEST_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        args.tests.clone()
    };
    let mut tests: Vec<Box<dyn QcTest>> = Vec::with_capacity(test_names.len());
    for name in &test_names {
        match by_name(name) {
            Some(t) => tests.push(t),
            None => {
                return output_args_error(
                    global,
                    &format!("unknown test '{}' (known: {})", name, TEST_NAMES.join(", ")),
                )
            }
        }
    }

    let pattern = assignment_pattern();
    let mut assignments = Vec::with_capacity(args.sets.len());
    for raw in &args.sets {
        match parse_assignment(&pattern, raw) {
            Ok(a) => assignments.push(a),
            Err(msg) => return output_args_error(global, &msg),
        }
    }

    let registry = StatisticRegistry::with_builtins();
    let loaded = match load_config(global.config.as_deref(), &registry) {
        Ok(l) => l,
        Err(e) => return output_config_error(global, &log_ctx, &e),
    };
    log_config_source(&log_ctx, &loaded);

    let overrides_dir = args
        .overrides_dir
        .clone()
        .or_else(|| loaded.config.overrides_dir.clone())
        .unwrap_or_else(default_overrides_dir);
    let snapshot = loaded.snapshot.clone();

    let mut ctx = match QcContext::new(loaded.config) {
        Ok(c) => c.with_registry(registry),
        Err(e) => return output_error(global, &e),
    };
    if !args.no_overrides {
        ctx = ctx.with_override_store(Arc::new(OverrideStore::new(&overrides_dir)));
    }
    for a in &assignments {
        ctx = ctx.with_explicit(&a.test, &a.param, a.value);
    }
    if args.interactive {
        ctx = ctx.interactive(Box::new(StdinPrompt));
    }

    let mut batch: BatchResult<DatasetSummary> = BatchResult::default();
    let mut exit_code = ExitCode::Clean;
    for path in &args.datasets {
        let ds_ctx = log_ctx.with_dataset(path.display().to_string());
        let span = tracing::info_span!(
            "dataset",
            run_id = %ds_ctx.run_id,
            dataset = %path.display()
        );
        let _entered = span.enter();

        match process_dataset(&ctx, &tests, args, path, &ds_ctx) {
            Ok(summary) => batch.add_success(summary),
            Err(err) => {
                log_event!(
                    ds_ctx,
                    ERROR,
                    event_names::DATASET_FAILED,
                    Stage::Init,
                    "dataset not processed",
                    code = err.code(),
                    error = tracing::field::display(&err)
                );
                if exit_code == ExitCode::Clean {
                    exit_code = ExitCode::from(&err);
                }
                batch.add_failure(path.display().to_string(), &err);
            }
        }
    }

    log_event!(
        log_ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "QC run finished",
        succeeded = batch.succeeded.len(),
        failed = batch.failed.len()
    );

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": log_ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "config": {
                    "source": snapshot.config_source,
                    "path": snapshot.config_path,
                    "hash": snapshot.config_hash,
                },
                "flag_set": ctx.flag_set.name,
                "tests": test_names,
                "overrides_dir": (!args.no_overrides).then(|| overrides_dir.display().to_string()),
                "datasets": batch.succeeded,
                "failed": batch.failed,
            });
            print_json(&response);
        }
        OutputFormat::Summary => {
            for ds in &batch.succeeded {
                for o in &ds.outcomes {
                    match (&o.skipped, &o.counts) {
                        (Some(reason), _) => println!(
                            "[{}] {} {}: skipped ({})",
                            ds.identity, o.test, o.variable, reason
                        ),
                        (None, Some(c)) => println!(
                            "[{}] {} {}: good={} bad={} raw={} ({})",
                            ds.identity, o.test, o.variable, c.good, c.bad, c.raw, o.params
                        ),
                        (None, None) => {}
                    }
                }
            }
            for f in &batch.failed {
                println!("[{}] failed: {}", f.item_id, f.error.message);
            }
        }
    }

    exit_code
}

/// Load, test and write back one dataset.
fn process_dataset(
    ctx: &QcContext,
    tests: &[Box<dyn QcTest>],
    args: &RunArgs,
    path: &Path,
    log_ctx: &LogContext,
) -> qc_common::Result<DatasetSummary> {
    let mut dataset = load_dataset(path, ctx.flag_set.codes.raw)?;
    log_event!(
        log_ctx,
        INFO,
        event_names::DATASET_LOADED,
        Stage::Init,
        "dataset loaded",
        identity = tracing::field::display(&dataset.identity),
        variables = dataset.variables.len()
    );

    let explicit_targets = resolve_variables(&dataset, &args.variables)?;
    let mut outcomes = Vec::new();
    for test in tests {
        let span = tracing::debug_span!("test", test = test.name());
        let _entered = span.enter();
        let targets = match &explicit_targets {
            Some(t) => t.clone(),
            None => test.eligible_targets(ctx, &dataset),
        };
        for target in targets {
            let outcome = run_test(test.as_ref(), ctx, &mut dataset, target)?;
            if let Some(reason) = &outcome.skipped {
                tracing::debug!(
                    test = test.name(),
                    variable = %outcome.variable,
                    reason = %reason,
                    "test skipped"
                );
            }
            let target_names = outcome
                .targets
                .iter()
                .filter_map(|t| dataset.series(*t).ok().map(|s| s.name.to_string()))
                .collect();
            outcomes.push(OutcomeSummary {
                test: outcome.test,
                variable: outcome.variable.clone(),
                counts: outcome
                    .flags
                    .as_ref()
                    .map(|_| outcome.counts(&ctx.flag_set)),
                skipped: outcome.skipped,
                params: outcome.param_log,
                targets: target_names,
                burst_stats: outcome.burst_stats,
            });
        }
    }

    let written_to = if args.no_write {
        None
    } else {
        let out = args.output.clone().unwrap_or_else(|| path.to_path_buf());
        save_dataset(&dataset, &out)?;
        log_event!(
            log_ctx,
            INFO,
            event_names::DATASET_SAVED,
            Stage::Report,
            "dataset written",
            path = tracing::field::display(out.display())
        );
        Some(out.display().to_string())
    };

    Ok(DatasetSummary {
        path: path.display().to_string(),
        flags_digest: dataset.flags_digest(),
        identity: dataset.identity,
        outcomes,
        written_to,
    })
}

/// Targets for `--variable`; `None` means each test picks its own.
fn resolve_variables(
    dataset: &Dataset,
    names: &[String],
) -> qc_common::Result<Option<Vec<Target>>> {
    if names.is_empty() {
        return Ok(None);
    }
    names
        .iter()
        .map(|name| {
            dataset
                .find(name)
                .ok_or_else(|| Error::MissingField(name.clone()))
        })
        .collect::<qc_common::Result<Vec<_>>>()
        .map(Some)
}

fn log_config_source(log_ctx: &LogContext, loaded: &LoadedConfig) {
    match &loaded.path.path {
        Some(p) => log_event!(
            log_ctx,
            INFO,
            event_names::CONFIG_LOADED,
            Stage::Init,
            "configuration loaded",
            path = tracing::field::display(p.display()),
            source = tracing::field::display(&loaded.path.source),
            hash = loaded.snapshot.short_id()
        ),
        None => log_event!(
            log_ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "no qc.json found, using built-in defaults"
        ),
    }
}

// ============================================================================
// overrides
// ============================================================================

fn run_overrides(global: &GlobalOpts, args: &OverridesArgs) -> ExitCode {
    let dir = match &args.overrides_dir {
        Some(d) => d.clone(),
        None => {
            // the configured directory applies when no flag or env var names one
            let registry = StatisticRegistry::with_builtins();
            match load_config(global.config.as_deref(), &registry) {
                Ok(loaded) => loaded
                    .config
                    .overrides_dir
                    .unwrap_or_else(default_overrides_dir),
                Err(e) => {
                    return output_config_error(global, &LogContext::new(generate_run_id()), &e)
                }
            }
        }
    };
    let store = OverrideStore::new(&dir);

    match &args.command {
        OverridesCommands::Show { dataset_id } => {
            let id = DatasetId::new(dataset_id.as_str());
            match store.load(&id) {
                Ok(record) => {
                    match global.format {
                        OutputFormat::Json => print_json(&serde_json::json!({
                            "schema_version": SCHEMA_VERSION,
                            "identity": id,
                            "path": store.record_path(&id).display().to_string(),
                            "record": record,
                        })),
                        OutputFormat::Summary => match record {
                            Some(r) => {
                                for (test, params) in &r.tests {
                                    for (param, value) in params {
                                        println!("[{}] {}.{}={}", id, test, param, value);
                                    }
                                }
                            }
                            None => println!("[{}] no stored overrides", id),
                        },
                    }
                    ExitCode::Clean
                }
                Err(e) => output_error(global, &Error::from(e)),
            }
        }
        OverridesCommands::Reset { dataset_id, test } => {
            let id = DatasetId::new(dataset_id.as_str());
            match store.reset(&id, test.as_deref()) {
                Ok(removed) => {
                    tracing::info!(
                        target: event_names::OVERRIDE_RESET,
                        stage = %Stage::Persist,
                        dataset = %id,
                        test = test.as_deref().unwrap_or("*"),
                        removed,
                        message = "overrides reset"
                    );
                    match global.format {
                        OutputFormat::Json => print_json(&serde_json::json!({
                            "schema_version": SCHEMA_VERSION,
                            "identity": id,
                            "test": test,
                            "removed": removed,
                        })),
                        OutputFormat::Summary => println!(
                            "[{}] reset {}: {}",
                            id,
                            test.as_deref().unwrap_or("all tests"),
                            if removed { "removed" } else { "nothing stored" }
                        ),
                    }
                    ExitCode::Clean
                }
                Err(e) => output_error(global, &Error::from(e)),
            }
        }
    }
}

// ============================================================================
// config
// ============================================================================

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => run_config_show(global),
        ConfigCommands::Validate { path } => {
            run_config_validate(global, path.as_deref().or(global.config.as_deref()))
        }
    }
}

/// Display the resolved configuration (defaults if no file is present).
fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let log_ctx = LogContext::new(generate_run_id());
    let registry = StatisticRegistry::with_builtins();
    let loaded = match load_config(global.config.as_deref(), &registry) {
        Ok(l) => l,
        Err(e) => return output_config_error(global, &log_ctx, &e),
    };

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "run_id": log_ctx.run_id,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "snapshot": loaded.snapshot,
            "config": loaded.config,
        })),
        OutputFormat::Summary => {
            let source = loaded
                .snapshot
                .config_path
                .clone()
                .unwrap_or_else(|| "built-in defaults".to_string());
            println!(
                "[{}] config: {} flag_set={} hash={}",
                log_ctx.run_id,
                source,
                loaded.snapshot.summary.flag_set,
                loaded.snapshot.short_id()
            );
        }
    }
    ExitCode::Clean
}

fn run_config_validate(global: &GlobalOpts, path: Option<&Path>) -> ExitCode {
    let log_ctx = LogContext::new(generate_run_id());
    let registry = StatisticRegistry::with_builtins();
    match load_config(path, &registry) {
        Ok(loaded) => {
            match global.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "schema_version": SCHEMA_VERSION,
                    "run_id": log_ctx.run_id,
                    "generated_at": chrono::Utc::now().to_rfc3339(),
                    "status": "valid",
                    "path": loaded.snapshot.config_path,
                    "source": loaded.snapshot.config_source,
                    "hash": loaded.snapshot.config_hash,
                })),
                OutputFormat::Summary => println!("[{}] config validate: OK", log_ctx.run_id),
            }
            ExitCode::Clean
        }
        Err(e) => output_config_error(global, &log_ctx, &e),
    }
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize output: {}", e),
    }
}

fn use_color(global: &GlobalOpts) -> bool {
    !global.no_color && std::io::stderr().is_terminal()
}

/// Output a config error in the appropriate format.
fn output_config_error(
    global: &GlobalOpts,
    log_ctx: &LogContext,
    error: &ValidationError,
) -> ExitCode {
    log_event!(
        log_ctx,
        ERROR,
        event_names::CONFIG_ERROR,
        Stage::Init,
        "configuration rejected",
        code = error.code(),
        error = tracing::field::display(error)
    );
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "status": "error",
                "error": {
                    "code": error.code(),
                    "message": error.to_string(),
                }
            });
            match serde_json::to_string_pretty(&response) {
                Ok(s) => eprintln!("{}", s),
                Err(_) => eprintln!("{}", error),
            }
        }
        OutputFormat::Summary => eprintln!("config error: {}", error),
    }
    ExitCode::ConfigError
}

fn output_error(global: &GlobalOpts, error: &Error) -> ExitCode {
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(error).to_json()),
        OutputFormat::Summary => eprintln!("{}", format_error_human(error, use_color(global))),
    }
    ExitCode::from(error)
}

fn output_args_error(global: &GlobalOpts, message: &str) -> ExitCode {
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "status": "error",
                "error": {
                    "code": ExitCode::ArgsError.as_i32(),
                    "message": message,
                }
            });
            match serde_json::to_string_pretty(&response) {
                Ok(s) => eprintln!("{}", s),
                Err(_) => eprintln!("{}", message),
            }
        }
        OutputFormat::Summary => eprintln!("error: {}", message),
    }
    ExitCode::ArgsError
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "name": "qc-core",
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": SCHEMA_VERSION,
            "tests": TEST_NAMES,
        })),
        OutputFormat::Summary => println!("qc-core {}", env!("CARGO_PKG_VERSION")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments() {
        let re = assignment_pattern();
        let a = parse_assignment(&re, "correlation_magnitude.cmag=110").unwrap();
        assert_eq!(a.test, "correlation_magnitude");
        assert_eq!(a.param, "cmag");
        assert_eq!(a.value, 110.0);

        let b = parse_assignment(&re, "spike.TEMP_shallow=4.5").unwrap();
        assert_eq!(b.param, "TEMP_shallow");
    }

    #[test]
    fn rejects_bad_assignments() {
        let re = assignment_pattern();
        assert!(parse_assignment(&re, "cmag=110").is_err());
        assert!(parse_assignment(&re, "gradient.x=1").is_err());
        assert!(parse_assignment(&re, "spike.TEMP_threshold=abc").is_err());
        assert!(parse_assignment(&re, "spike.TEMP_threshold=inf").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
