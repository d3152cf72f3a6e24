//! Structured logging foundation for qc-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for batch pipelines
//!
//! # Usage
//!
//! ```ignore
//! use qc_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id()).with_dataset("ADCP_2019.json");
//! log_event!(ctx, INFO, event_names::DATASET_LOADED, Stage::Init, "dataset loaded");
//! ```
//!
//! # Design Notes
//!
//! - stdout is reserved for command payloads (JSON summaries)
//! - stderr receives all log output (human or JSONL)
//! - Events carry correlation IDs (run_id, dataset) for tracing
//! - Tests that skip emit nothing

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber on stderr.
///
/// Call once at startup. A subscriber that is already installed (tests,
/// embedders) is left in place.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.filter_directives())
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            let registry = tracing_subscriber::registry().with(filter);
            let _ = if config.timestamps {
                registry.with(fmt_layer).try_init()
            } else {
                registry.with(fmt_layer.without_time()).try_init()
            };
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Structured event logging with context.
///
/// Usage:
/// ```ignore
/// log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting QC run");
/// log_event!(ctx, WARN, event_names::DATASET_FAILED, Stage::Init, "dataset rejected",
///     code = 22);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            dataset = $ctx.dataset.as_deref().unwrap_or("-"),
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            dataset = $ctx.dataset.as_deref().unwrap_or("-"),
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            dataset = $ctx.dataset.as_deref().unwrap_or("-"),
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            dataset = $ctx.dataset.as_deref().unwrap_or("-"),
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
}
