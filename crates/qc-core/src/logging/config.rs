//! Logging configuration.
//!
//! Precedence, highest first: CLI flags (`--log-level`, `--log-format`, `-v`,
//! `-q`), then `QC_LOG` / `QC_LOG_FORMAT`, then `RUST_LOG` directives, then
//! `info` in human format. `QC_LOG_TIMESTAMPS=0` drops timestamps from human
//! output.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const ENV_LEVEL: &str = "QC_LOG";
pub const ENV_FORMAT: &str = "QC_LOG_FORMAT";
pub const ENV_TIMESTAMPS: &str = "QC_LOG_TIMESTAMPS";
pub const ENV_DIRECTIVES: &str = "RUST_LOG";

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    #[value(alias = "json")]
    Jsonl,
}

/// Minimum level that reaches stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "quiet")]
    Off,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Raw `RUST_LOG` directives (e.g. `qc_core::overrides=trace`), used only
    /// when no level was chosen explicitly.
    pub directives: Option<String>,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            directives: None,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Configuration from the process environment plus CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(cli_level, cli_format, |key| std::env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] over an arbitrary variable lookup.
    pub fn resolve<F>(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_level = |v: String| LogLevel::from_str(v.trim(), true).ok();
        let parse_format = |v: String| LogFormat::from_str(v.trim(), true).ok();

        let env_level = env(ENV_LEVEL).and_then(parse_level);
        let level = cli_level.or(env_level).unwrap_or_default();
        let directives = if cli_level.is_none() && env_level.is_none() {
            env(ENV_DIRECTIVES).filter(|d| !d.trim().is_empty())
        } else {
            None
        };

        LogConfig {
            format: cli_format
                .or_else(|| env(ENV_FORMAT).and_then(parse_format))
                .unwrap_or_default(),
            level,
            directives,
            timestamps: env(ENV_TIMESTAMPS).map_or(true, |v| v.trim() != "0"),
        }
    }

    /// Filter directive string for the subscriber.
    pub fn filter_directives(&self) -> String {
        self.directives
            .clone()
            .unwrap_or_else(|| self.level.as_directive().to_string())
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.directives = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = LogConfig::resolve(None, None, env(&[]));
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.filter_directives(), "info");
    }

    #[test]
    fn qc_log_beats_rust_log() {
        let config = LogConfig::resolve(
            None,
            None,
            env(&[(ENV_LEVEL, "Warning"), (ENV_DIRECTIVES, "qc_core=trace")]),
        );
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.filter_directives(), "warn");
    }

    #[test]
    fn rust_log_directives_pass_through() {
        let config = LogConfig::resolve(
            None,
            None,
            env(&[(ENV_DIRECTIVES, "qc_core::overrides=trace,info")]),
        );
        assert_eq!(config.filter_directives(), "qc_core::overrides=trace,info");
    }

    #[test]
    fn cli_beats_environment() {
        let config = LogConfig::resolve(
            Some(LogLevel::Error),
            Some(LogFormat::Jsonl),
            env(&[(ENV_LEVEL, "trace"), (ENV_FORMAT, "human")]),
        );
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.format, LogFormat::Jsonl);
    }

    #[test]
    fn format_and_timestamps_from_environment() {
        let config = LogConfig::resolve(
            None,
            None,
            env(&[(ENV_FORMAT, "json"), (ENV_TIMESTAMPS, "0")]),
        );
        assert_eq!(config.format, LogFormat::Jsonl);
        assert!(!config.timestamps);
    }

    #[test]
    fn unparsable_level_is_ignored() {
        let config = LogConfig::resolve(None, None, env(&[(ENV_LEVEL, "loud")]));
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn with_level_clears_directives() {
        let config = LogConfig::resolve(None, None, env(&[(ENV_DIRECTIVES, "debug")]))
            .with_level(LogLevel::Off);
        assert_eq!(config.filter_directives(), "off");
    }
}
