//! No-mock configuration validation + resolution tests.
//!
//! Covers:
//! - Validation of real JSON documents written to disk
//! - Resolution order (CLI > QC_CONFIG > QC_CONFIG_DIR > defaults)
//! - Override directory selection

use qc_config::resolve::{default_overrides_dir, resolve_config, ConfigSource};
use qc_config::{load_config, validate_config, QcConfig, SpikeThreshold, ValidationError};
use qc_math::StatisticRegistry;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: [&str; 3] = ["QC_CONFIG", "QC_CONFIG_DIR", "QC_OVERRIDES_DIR"];

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write config");
    path
}

const FULL_CONFIG: &str = r#"{
    "schema_version": "1.0.0",
    "flag_set": "imos",
    "burst": {
        "TEMP": {"average": "mean", "dispersion": "std", "dispersion_scale": 2.0},
        "TURB": {"average": "median", "dispersion": "mad"}
    },
    "spike": {
        "TEMP": {"pressure_dependent": {"shallow": 6.0, "deep": 2.0, "split_dbar": 500}},
        "CNDC": "five_point_aggregate"
    },
    "velocity": {
        "correlation_magnitude": {"cmag": 110},
        "percent_good": {"min_pgood": 50},
        "echo_range": {"ea_thresh": 30}
    }
}"#;

#[test]
fn full_document_validates() {
    let cfg = QcConfig::from_str(FULL_CONFIG).expect("parse");
    validate_config(&cfg, &StatisticRegistry::with_builtins()).expect("valid");
    assert_eq!(cfg.burst.parameters.len(), 2);
    assert_eq!(
        cfg.burst.for_parameter("TEMP").map(|s| s.dispersion_scale),
        Some(2.0)
    );
    assert!(matches!(
        cfg.spike.for_variable("CNDC"),
        Some(SpikeThreshold::FivePointAggregate)
    ));
    assert_eq!(cfg.velocity.echo_range.ea_thresh, 30.0);
}

#[test]
fn custom_registry_statistics_validate() {
    fn trimmed(v: &[f64]) -> f64 {
        qc_math::median(v)
    }
    let cfg = QcConfig::from_str(
        r#"{"burst": {"TEMP": {"average": "trimmed", "dispersion": "std"}}}"#,
    )
    .expect("parse");

    let builtins = StatisticRegistry::with_builtins();
    assert!(matches!(
        validate_config(&cfg, &builtins),
        Err(ValidationError::UnknownStatistic { .. })
    ));

    let mut extended = StatisticRegistry::with_builtins();
    extended.register("trimmed", trimmed);
    validate_config(&cfg, &extended).expect("valid with registered statistic");
}

#[test]
fn resolution_prefers_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let tmp = TempDir::new().expect("tempdir");
        let cli = write_config(tmp.path(), "cli.json", "{}");
        let env_path = write_config(tmp.path(), "env.json", "{}");
        env::set_var("QC_CONFIG", &env_path);

        let resolved = resolve_config(Some(&cli));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.as_deref(), Some(cli.as_path()));

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.as_deref(), Some(env_path.as_path()));
    });
}

#[test]
fn resolution_uses_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        env::remove_var("QC_CONFIG");
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(tmp.path(), "qc.json", FULL_CONFIG);
        env::set_var("QC_CONFIG_DIR", tmp.path());

        let loaded =
            load_config(None, &StatisticRegistry::with_builtins()).expect("load from dir");
        assert_eq!(loaded.path.source, ConfigSource::Environment);
        assert_eq!(loaded.path.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.velocity.correlation_magnitude.cmag, 110.0);
    });
}

#[test]
fn invalid_document_fails_load() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(
            tmp.path(),
            "qc.json",
            r#"{"velocity": {"echo_range": {"ea_thresh": -5}}}"#,
        );
        let err = load_config(Some(&path), &StatisticRegistry::with_builtins()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidValue { ref field, .. }
                if field == "velocity.echo_range.ea_thresh"
        ));
    });
}

#[test]
fn overrides_dir_env_wins() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&ENV_KEYS);
        let tmp = TempDir::new().expect("tempdir");
        env::set_var("QC_OVERRIDES_DIR", tmp.path());
        assert_eq!(default_overrides_dir(), tmp.path());

        env::remove_var("QC_OVERRIDES_DIR");
        assert!(default_overrides_dir().ends_with("ocean-qc/overrides"));
    });
}
