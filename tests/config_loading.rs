// tests/config_loading.rs

mod common;

use std::error::Error;
use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use fileshipper::config::{
    load_and_validate, load_from_path, load_or_default, validate_config, ConfigFile,
    MAX_SUPPORTED_DEPTH,
};
use fileshipper::errors::ShipperError;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn defaults_match_stock_behaviour() -> TestResult {
    let cfg = load_or_default(None)?;

    assert_eq!(cfg.watch.max_depth, 4);
    assert_eq!(cfg.watch.max_path_len, 96);
    assert_eq!(cfg.watch.max_name_len, 48);
    assert_eq!(cfg.watch.tick(), Duration::from_secs(2));
    assert_eq!(cfg.transport.default_port, 1883);
    assert_eq!(cfg.transport.reconnect_delay(), Duration::from_secs(10));
    assert_eq!(cfg.transport.max_failures, 360);
    assert_eq!(cfg.transport.socket_timeout(), Duration::from_secs(600));
    assert_eq!(cfg.transfer.chunk_size, 31560);
    assert_eq!(cfg.transfer.last_file_grace(), Duration::from_secs(240));
    assert_eq!(cfg.transfer.data_suffix, ".dat");
    assert_eq!(cfg.transfer.pause_after_send(), Duration::from_secs(1));
    Ok(())
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let file = write_config("")?;
    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.watch.max_depth, ConfigFile::default().watch.max_depth);
    Ok(())
}

#[test]
fn partial_sections_override_selected_fields() -> TestResult {
    let file = write_config(
        r#"
[watch]
max_depth = 6

[transport]
reconnect_delay_secs = 3
max_failures = 20

[transfer]
data_suffix = ".bin"
pause_after_send_millis = 0
"#,
    )?;

    let cfg = load_or_default(Some(file.path()))?;
    assert_eq!(cfg.watch.max_depth, 6);
    assert_eq!(cfg.watch.max_name_len, 48);
    assert_eq!(cfg.transport.reconnect_delay(), Duration::from_secs(3));
    assert_eq!(cfg.transport.max_failures, 20);
    assert_eq!(cfg.transport.default_port, 1883);
    assert_eq!(cfg.transfer.data_suffix, ".bin");
    assert!(cfg.transfer.pause_after_send().is_zero());
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let file = write_config("[watch]\nmax_dept = 3\n")?;
    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, ShipperError::TomlError(_)), "{err}");
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_or_default(Some(std::path::Path::new("/nonexistent/fileshipper.toml")))
        .unwrap_err();
    assert!(matches!(err, ShipperError::IoError(_)), "{err}");
}

#[test]
fn depth_limits_are_enforced() -> TestResult {
    for depth in [0, MAX_SUPPORTED_DEPTH + 1] {
        let file = write_config(&format!("[watch]\nmax_depth = {depth}\n"))?;
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(matches!(err, ShipperError::ConfigError(_)), "{err}");
    }

    let file = write_config(&format!("[watch]\nmax_depth = {MAX_SUPPORTED_DEPTH}\n"))?;
    load_and_validate(file.path())?;
    Ok(())
}

#[test]
fn inconsistent_values_fail_validation() {
    let cases: [(&str, fn(&mut ConfigFile)); 9] = [
        ("path <= name", |c| c.watch.max_path_len = c.watch.max_name_len),
        ("zero buffer", |c| c.watch.event_buffer = 0),
        ("zero tick", |c| c.watch.tick_secs = 0),
        ("zero port", |c| c.transport.default_port = 0),
        ("zero failures", |c| c.transport.max_failures = 0),
        ("zero socket timeout", |c| c.transport.socket_timeout_secs = 0),
        ("zero connect timeout", |c| c.transport.connect_timeout_secs = 0),
        ("zero chunk", |c| c.transfer.chunk_size = 0),
        ("empty suffix", |c| c.transfer.data_suffix.clear()),
    ];

    for (label, mutate) in cases {
        let mut cfg = ConfigFile::default();
        mutate(&mut cfg);
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ShipperError::ConfigError(_)), "{label}: {err}");
    }
}
