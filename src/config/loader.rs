// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file from a given path without validating it.
///
/// This only performs TOML deserialization; missing fields fall back to the
/// compiled defaults. Use [`load_and_validate`] for the checked version.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Resolve the effective configuration.
///
/// With no path the compiled defaults are used as-is.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(path) => {
            debug!(?path, "loading config file");
            load_and_validate(path)
        }
        None => {
            let config = ConfigFile::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}
