// src/logging.rs

//! Logging setup for `fileshipper` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `FILESHIPPER_LOG` environment variable, in `EnvFilter` syntax
//!    (e.g. "debug" or "fileshipper::transport=trace,info")
//! 3. default to `info`
//!
//! Logs go to STDERR, which is what the device's supervisor captures.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "FILESHIPPER_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env_value.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    Ok(())
}

/// Resolve the effective filter. An unparsable environment value falls
/// back to the default rather than silencing the daemon.
pub fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return EnvFilter::new(directive_for(lvl));
    }

    match env_value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => {
            EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
