// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `fileshipper`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fileshipper",
    version,
    about = "Ship completed data files to a remote collector, deleting each one once receipt is confirmed.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to watch. This is depth 0 of the tracked tree.
    #[arg(value_name = "WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Collector address: an IP address or a resolvable host name.
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Serial number of this device, sent along with every file.
    #[arg(value_name = "SERIAL", value_parser = parse_serial)]
    pub serial: String,

    /// Collector port, decimal or `0x`-prefixed hex.
    ///
    /// If omitted, `[transport].default_port` from the config is used
    /// (1883 unless overridden).
    #[arg(value_name = "PORT", value_parser = parse_port)]
    pub port: Option<u16>,

    /// Optional TOML file overriding the compiled defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FILESHIPPER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse a TCP port in `1..=65535`.
pub fn parse_port(s: &str) -> Result<u16, String> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };

    match parsed {
        Ok(port @ 1..=65535) => Ok(port as u16),
        _ => Err(format!("invalid port {s} (expected 1-65535)")),
    }
}

fn parse_serial(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("serial number must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Parse the process arguments.
///
/// Usage errors exit with status 1; `--help` and `--version` exit with 0.
pub fn parse() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}
