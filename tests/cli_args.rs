// tests/cli_args.rs

mod common;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use fileshipper::cli::{parse_port, CliArgs, LogLevel};
use fileshipper::logging::build_filter;
use fileshipper::resolve_server;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn positional_arguments_parse() -> TestResult {
    let args = CliArgs::try_parse_from(["fileshipper", "/data", "10.0.0.5", "SN-42", "0x75B"])?;
    assert_eq!(args.watch_dir, PathBuf::from("/data"));
    assert_eq!(args.server, "10.0.0.5");
    assert_eq!(args.serial, "SN-42");
    assert_eq!(args.port, Some(1883));
    assert!(args.config.is_none());
    assert!(args.log_level.is_none());
    Ok(())
}

#[test]
fn port_and_options_are_optional() -> TestResult {
    let args = CliArgs::try_parse_from([
        "fileshipper",
        "--config",
        "/etc/fileshipper.toml",
        "--log-level",
        "debug",
        "/data",
        "collector.local",
        "SN1",
    ])?;
    assert_eq!(args.port, None);
    assert_eq!(args.config, Some(PathBuf::from("/etc/fileshipper.toml")));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    Ok(())
}

#[test]
fn missing_serial_is_a_usage_error() {
    let err = CliArgs::try_parse_from(["fileshipper", "/data", "10.0.0.5"]).unwrap_err();
    assert!(err.use_stderr());
}

#[test]
fn empty_serial_is_rejected() {
    assert!(CliArgs::try_parse_from(["fileshipper", "/data", "10.0.0.5", ""]).is_err());
}

#[test]
fn ports_accept_decimal_and_hex() {
    assert_eq!(parse_port("1883"), Ok(1883));
    assert_eq!(parse_port("0X1F"), Ok(31));
    assert_eq!(parse_port("0xffff"), Ok(65535));
    assert_eq!(parse_port("1"), Ok(1));

    for bad in ["0", "65536", "0x0", "abc", "", "-1", "0x"] {
        assert!(parse_port(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn server_addresses_resolve() -> TestResult {
    let addr = resolve_server("127.0.0.1", 1883)?;
    assert_eq!(addr.port(), 1883);
    assert!(addr.ip().is_loopback());

    assert!(resolve_server("not a host name", 1883).is_err());
    Ok(())
}

#[test]
fn log_filter_prefers_cli_then_env_then_default() {
    assert_eq!(build_filter(Some(LogLevel::Warn), Some("trace")).to_string(), "warn");
    assert_eq!(build_filter(None, Some("debug")).to_string(), "debug");
    assert_eq!(build_filter(None, Some("  ")).to_string(), "info");
    assert_eq!(build_filter(None, Some("fileshipper=bogus")).to_string(), "info");
    assert_eq!(build_filter(None, None).to_string(), "info");
}
