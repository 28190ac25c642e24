// src/watch/scanner.rs

//! Backfill scans: ship what is already on disk and put a watch on the live
//! branch.
//!
//! A scan lists a directory once, ships its files in name order, then walks
//! its subdirectories in name order. Only the last subdirectory of a live
//! directory is itself live: it is watched before being scanned, so nothing
//! created in it between listing and watching is missed. Every other
//! subdirectory is drained and then removed if empty.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::shutdown::Shutdown;
use crate::errors::{Result, ShipperError};
use crate::fs::{remove_dir_best_effort, EntryKind, FileSystem};
use crate::transport::FileSink;
use crate::watch::facility::WatchFacility;
use crate::watch::path_utils::ScanLimits;
use crate::watch::table::WatchTable;

/// The mutable state a scan needs to touch.
pub struct ScanContext<'a> {
    pub table: &'a mut WatchTable,
    pub facility: &'a mut dyn WatchFacility,
    pub sink: &'a mut dyn FileSink,
}

/// Entries of one directory, split by kind and sorted by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<OsString>,
    pub dirs: Vec<OsString>,
}

#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    fs: Arc<dyn FileSystem>,
    limits: ScanLimits,
    last_file_grace: Duration,
    shutdown: Shutdown,
}

impl DirectoryScanner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        limits: ScanLimits,
        last_file_grace: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            fs,
            limits,
            last_file_grace,
            shutdown,
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Scan `dir`, which sits at `depth`. Its entries are at `depth + 1`.
    ///
    /// When `live` is set, `dir` is expected to be watched already.
    pub fn scan(
        &self,
        dir: &Path,
        depth: usize,
        live: bool,
        ctx: &mut ScanContext<'_>,
    ) -> Result<()> {
        debug!(?dir, depth, live, "scanning directory");
        let listing = self.list(dir)?;
        self.ship_files(dir, &listing.files, live, ctx)?;
        self.descend(dir, depth, live, &listing.dirs, ctx)
    }

    /// List and classify the entries of `dir`, enforcing the length limits.
    pub fn list(&self, dir: &Path) -> Result<Listing> {
        let names = self
            .fs
            .read_dir(dir)
            .map_err(|source| ShipperError::UnreadableDirectory {
                path: dir.to_path_buf(),
                source,
            })?;

        let mut listing = Listing::default();
        for name in names {
            if name == "." || name == ".." {
                continue;
            }
            self.limits.check_path(dir, &name)?;

            let path = dir.join(&name);
            match self.fs.entry_kind(&path) {
                Ok(EntryKind::Directory) => {
                    self.limits.check_name(&name, true)?;
                    listing.dirs.push(name);
                }
                Ok(EntryKind::File) => {
                    self.limits.check_name(&name, false)?;
                    listing.files.push(name);
                }
                Ok(EntryKind::Other) => debug!(?path, "ignoring special file"),
                // Most likely removed between listing and stat.
                Err(err) => warn!(?path, error = %err, "could not read entry"),
            }
        }

        listing.files.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    fn ship_files(
        &self,
        dir: &Path,
        files: &[OsString],
        live: bool,
        ctx: &mut ScanContext<'_>,
    ) -> Result<()> {
        for (index, name) in files.iter().enumerate() {
            let path = dir.join(name);

            // The newest file of a live directory may still be open for writing.
            if live && index + 1 == files.len() && !self.last_file_grace.is_zero() {
                info!(?path, grace = ?self.last_file_grace, "waiting before sending last file");
                self.shutdown.sleep(self.last_file_grace)?;
            }

            match ctx.sink.ship(&path) {
                Ok(outcome) => debug!(?path, ?outcome, "backfilled file"),
                Err(err) if !err.is_fatal() => {
                    warn!(error = %err, "skipping file (deleted concurrently or not fully written)")
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn descend(
        &self,
        dir: &Path,
        depth: usize,
        live: bool,
        dirs: &[OsString],
        ctx: &mut ScanContext<'_>,
    ) -> Result<()> {
        let child_depth = depth + 1;

        for (index, name) in dirs.iter().enumerate() {
            let path = dir.join(name);
            let on_live_branch = live && index + 1 == dirs.len();
            let child_live = on_live_branch && child_depth <= ctx.table.max_depth();

            if child_live {
                let handle = ctx.facility.add_watch(&path)?;
                ctx.table.install(child_depth, handle, &path)?;
            } else if on_live_branch {
                warn!(
                    ?path,
                    depth = child_depth,
                    "directory is past the maximum watch depth; draining without a watch"
                );
            }

            self.scan(&path, child_depth, child_live, ctx)?;

            if !on_live_branch {
                remove_dir_best_effort(self.fs.as_ref(), &path);
            }
        }
        Ok(())
    }
}
