//! Structured logging setup for ttlkv
//!
//! The library itself only emits `tracing` events. Binaries and test suites
//! call [`init_logging`] to install a subscriber matching the configured
//! level, format and destination.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Result, TtlKvError};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Parse log level string to tracing Level
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(TtlKvError::config(
            format!("Invalid log level: {level_str}"),
            "logging.level",
        )),
    }
}

/// Filter honouring `RUST_LOG` on top of the configured default level
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let level = parse_log_level(&config.level)?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

/// Install the global subscriber.
///
/// A subscriber that is already installed (a test harness, an embedding
/// application) is left in place and a warning is logged through it.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let installed = match &config.file_path {
        Some(path) => {
            let file = open_log_file(path)?;
            let base = fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true);
            match config.format {
                LogFormat::Json => Registry::default()
                    .with(env_filter)
                    .with(base.json().with_current_span(false).with_span_list(true))
                    .try_init(),
                LogFormat::Pretty => Registry::default()
                    .with(env_filter)
                    .with(base.pretty().with_file(true).with_line_number(true))
                    .try_init(),
                LogFormat::Compact => Registry::default()
                    .with(env_filter)
                    .with(base.compact())
                    .try_init(),
            }
        }
        None => {
            let base = fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoUtc::rfc_3339());
            match config.format {
                LogFormat::Json => Registry::default()
                    .with(env_filter)
                    .with(
                        base.json()
                            .with_current_span(false)
                            .with_span_list(true)
                            .with_target(true),
                    )
                    .try_init(),
                LogFormat::Pretty => Registry::default()
                    .with(env_filter)
                    .with(base.pretty().with_target(true))
                    .try_init(),
                LogFormat::Compact => Registry::default()
                    .with(env_filter)
                    .with(base.compact().with_target(false))
                    .try_init(),
            }
        }
    };

    if let Err(e) = installed {
        warn!(
            "Failed to initialize tracing subscriber (may already be set): {}",
            e
        );
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(TtlKvError::from)
}
