// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Watch table invariant violated: {0}")]
    WatchTable(String),

    #[error("{} is not a readable directory: {source}", path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("name {name:?} has length {len}; max allowed is {max}")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("path {path:?} has length {len}; max allowed is {max}")]
    PathTooLong { path: String, len: usize, max: usize },

    #[error("could not read {}: {source}", path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("connection lost; failed {failures} times in a row")]
    RetriesExhausted { failures: u32 },

    #[error("shutdown requested")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShipperError {
    /// Whether this error must stop the daemon.
    ///
    /// Local read failures stay with the file that caused them; everything
    /// else ends the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ShipperError::LocalRead { .. })
    }

    /// Problems with the directory tree itself (unreadable, oversize names,
    /// a watch that could not be added). Fatal during the startup scan, only
    /// logged for a backfill triggered by a new directory.
    pub fn is_scan_failure(&self) -> bool {
        matches!(
            self,
            ShipperError::UnreadableDirectory { .. }
                | ShipperError::NameTooLong { .. }
                | ShipperError::PathTooLong { .. }
                | ShipperError::WatchError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ShipperError>;
