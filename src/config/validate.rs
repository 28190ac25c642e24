// src/config/validate.rs

use crate::config::model::{ConfigFile, MAX_SUPPORTED_DEPTH};
use crate::errors::{Result, ShipperError};

/// Check the semantic invariants serde cannot express.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    validate_transport(cfg)?;
    validate_transfer(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> ShipperError {
    ShipperError::ConfigError(msg)
}

fn validate_watch(cfg: &ConfigFile) -> Result<()> {
    let watch = &cfg.watch;

    if watch.max_depth == 0 || watch.max_depth > MAX_SUPPORTED_DEPTH {
        return Err(config_error(format!(
            "[watch].max_depth must be between 1 and {} (got {})",
            MAX_SUPPORTED_DEPTH, watch.max_depth
        )));
    }

    if watch.event_buffer == 0 {
        return Err(config_error(
            "[watch].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    if watch.max_name_len < 2 {
        return Err(config_error(format!(
            "[watch].max_name_len must be >= 2 (got {})",
            watch.max_name_len
        )));
    }

    if watch.max_path_len <= watch.max_name_len {
        return Err(config_error(format!(
            "[watch].max_path_len ({}) must be greater than max_name_len ({})",
            watch.max_path_len, watch.max_name_len
        )));
    }

    if watch.tick_secs == 0 {
        return Err(config_error(
            "[watch].tick_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_transport(cfg: &ConfigFile) -> Result<()> {
    let transport = &cfg.transport;

    if transport.default_port == 0 {
        return Err(config_error(
            "[transport].default_port must be between 1 and 65535 (got 0)".to_string(),
        ));
    }

    if transport.max_failures == 0 {
        return Err(config_error(
            "[transport].max_failures must be >= 1 (got 0)".to_string(),
        ));
    }

    // A zero socket timeout would be rejected by `set_read_timeout`.
    if transport.socket_timeout_secs == 0 {
        return Err(config_error(
            "[transport].socket_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    if transport.connect_timeout_secs == 0 {
        return Err(config_error(
            "[transport].connect_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_transfer(cfg: &ConfigFile) -> Result<()> {
    let transfer = &cfg.transfer;

    if transfer.chunk_size == 0 {
        return Err(config_error(
            "[transfer].chunk_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if transfer.data_suffix.is_empty() {
        return Err(config_error(
            "[transfer].data_suffix must not be empty".to_string(),
        ));
    }

    Ok(())
}
