// src/watch/facility.rs

//! Interface to the filesystem change-notification facility.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::errors::Result;

/// Opaque identifier of one installed directory watch.
///
/// Handles are never reused by a facility, so an event carrying the handle
/// of a watch that was removed cannot be mistaken for a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub u64);

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// A subdirectory was created in the watched directory.
    DirectoryCreated,
    /// A file in the watched directory was closed after being written.
    FileClosed,
}

/// One notification, relative to the directory its watch was installed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub handle: WatchHandle,
    pub kind: WatchEventKind,
    pub name: OsString,
}

impl WatchEvent {
    pub fn directory_created(handle: WatchHandle, name: impl Into<OsString>) -> Self {
        Self {
            handle,
            kind: WatchEventKind::DirectoryCreated,
            name: name.into(),
        }
    }

    pub fn file_closed(handle: WatchHandle, name: impl Into<OsString>) -> Self {
        Self {
            handle,
            kind: WatchEventKind::FileClosed,
            name: name.into(),
        }
    }
}

/// A source of create / close-write notifications for individual
/// (non-recursive) directories.
pub trait WatchFacility {
    fn add_watch(&mut self, dir: &Path) -> Result<WatchHandle>;
    fn remove_watch(&mut self, handle: WatchHandle) -> Result<()>;

    /// Block until the next event arrives or `timeout` expires.
    ///
    /// `Ok(None)` means the timeout expired with nothing to report.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<WatchEvent>>;
}
