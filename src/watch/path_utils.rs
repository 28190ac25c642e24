// src/watch/path_utils.rs

//! Length limits for names and paths found while scanning.
//!
//! Lengths are measured in bytes of the platform encoding. A directory path
//! is measured as if rendered with a trailing separator, which is how the
//! collector sees it as the prefix of a shipped file's path.

use std::ffi::OsStr;
use std::path::{is_separator, Path};

use crate::config::WatchSection;
use crate::errors::{Result, ShipperError};

/// Hard ceilings applied to every entry a scan visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_path_len: usize,
    pub max_name_len: usize,
}

impl From<&WatchSection> for ScanLimits {
    fn from(watch: &WatchSection) -> Self {
        Self {
            max_path_len: watch.max_path_len,
            max_name_len: watch.max_name_len,
        }
    }
}

/// Length of `dir` including one trailing separator.
pub fn rendered_dir_len(dir: &Path) -> usize {
    let bytes = dir.as_os_str().as_encoded_bytes();
    match bytes.last() {
        Some(&last) if is_separator(last as char) => bytes.len(),
        _ => bytes.len() + 1,
    }
}

impl ScanLimits {
    /// Reject an entry name that is too long.
    ///
    /// Directory names need room for their own trailing separator, so they
    /// are allowed one byte less than file names.
    pub fn check_name(&self, name: &OsStr, is_dir: bool) -> Result<()> {
        let name_len = name.as_encoded_bytes().len();
        let name_budget = if is_dir { name_len + 1 } else { name_len };

        if name_budget >= self.max_name_len {
            return Err(ShipperError::NameTooLong {
                name: name.to_string_lossy().into_owned(),
                len: name_len,
                max: if is_dir {
                    self.max_name_len.saturating_sub(2)
                } else {
                    self.max_name_len - 1
                },
            });
        }
        Ok(())
    }

    /// Reject `dir/name` if it would not fit in `max_path_len` with a
    /// trailing separator.
    pub fn check_path(&self, dir: &Path, name: &OsStr) -> Result<()> {
        let len = rendered_dir_len(dir) + name.as_encoded_bytes().len() + 1;
        if len > self.max_path_len {
            return Err(ShipperError::PathTooLong {
                path: dir.join(name).to_string_lossy().into_owned(),
                len,
                max: self.max_path_len,
            });
        }
        Ok(())
    }
}
