use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fileshipper::errors::{Result, ShipperError};
use fileshipper::fs::FileSystem;
use fileshipper::transport::{FileSink, MessageIdCounter, SendOutcome};

/// A [`FileSink`] that records every path it is asked to ship.
///
/// With a filesystem attached, shipped files are deleted like a real
/// delivery would, and a missing file fails with `LocalRead` like an open
/// would. Paths marked unreadable always fail with `LocalRead`.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub shipped: Vec<PathBuf>,
    pub shipped_at: Vec<Instant>,
    unreadable: HashSet<PathBuf>,
    fs: Option<Arc<dyn FileSystem>>,
    ids: MessageIdCounter,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleting_from(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs: Some(fs),
            ..Self::default()
        }
    }

    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.insert(path.into());
        self
    }

    /// Shipped paths relative to `root`, as strings.
    pub fn shipped_relative(&self, root: &Path) -> Vec<String> {
        self.shipped
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }
}

impl FileSink for RecordingSink {
    fn ship(&mut self, path: &Path) -> Result<SendOutcome> {
        self.shipped.push(path.to_path_buf());
        self.shipped_at.push(Instant::now());

        if self.unreadable.contains(path) {
            return Err(ShipperError::LocalRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "unreadable"),
            });
        }
        if let Some(fs) = &self.fs {
            fs.remove_file(path).map_err(|source| ShipperError::LocalRead {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let id = self.ids.current();
        self.ids.advance();
        Ok(SendOutcome::Delivered { id })
    }
}
