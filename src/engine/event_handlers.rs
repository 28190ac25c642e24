// src/engine/event_handlers.rs

//! Reactions to individual watch events.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::remove_dir_best_effort;
use crate::transport::FileSink;
use crate::watch::{DirectoryScanner, Reroot, ScanContext, WatchHandle, WatchTable};

/// A subdirectory `name` appeared in the directory watched by `handle`.
///
/// If it is new, it becomes the live directory at its depth: everything
/// at that depth and below is unwatched and removed if empty, the new
/// directory is watched, and its existing contents are backfilled.
pub fn handle_directory_created(
    ctx: &mut ScanContext<'_>,
    scanner: &DirectoryScanner,
    handle: WatchHandle,
    name: &OsStr,
) -> Result<()> {
    let (depth, path, detached) = match ctx.table.begin_reroot(handle, name) {
        Reroot::UnknownHandle => {
            warn!(%handle, ?name, "new directory under an unwatched directory (ignored)");
            return Ok(());
        }
        Reroot::TooDeep { depth } => {
            warn!(?name, depth, "unexpected new directory past maximum depth (ignored)");
            return Ok(());
        }
        Reroot::Duplicate { path, .. } => {
            debug!(?path, "directory already found");
            return Ok(());
        }
        Reroot::Replace {
            depth,
            path,
            detached,
        } => (depth, path, detached),
    };

    info!(?path, depth, "found new directory");

    for (old_depth, slot) in detached {
        info!(path = ?slot.path, depth = old_depth, "unwatching superseded directory");
        if let Err(err) = ctx.facility.remove_watch(slot.handle) {
            warn!(path = ?slot.path, error = %err, "could not remove watch");
        }
        remove_dir_best_effort(scanner.fs(), &slot.path);
    }

    match backfill(ctx, scanner, depth, &path) {
        Ok(()) => {
            info!(?path, "finished processing existing files");
            Ok(())
        }
        Err(err) if err.is_scan_failure() => {
            warn!(?path, error = %err, "could not process existing files in new directory");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn backfill(
    ctx: &mut ScanContext<'_>,
    scanner: &DirectoryScanner,
    depth: usize,
    path: &Path,
) -> Result<()> {
    let handle = ctx.facility.add_watch(path)?;
    ctx.table.install(depth, handle, path)?;
    info!(?path, "processing existing files");
    scanner.scan(path, depth, true, ctx)
}

/// A file `name` in the directory watched by `handle` was closed after
/// writing. Only files in the deepest live directory are shipped.
pub fn handle_file_closed(
    table: &WatchTable,
    sink: &mut dyn FileSink,
    handle: WatchHandle,
    name: &OsStr,
) -> Result<()> {
    let path = match table.deepest() {
        Some((_, slot)) if slot.handle == handle => slot.path.join(name),
        _ => {
            warn!(%handle, ?name, "file appeared outside the live directory (not sent)");
            return Ok(());
        }
    };

    match sink.ship(&path) {
        Ok(outcome) => {
            debug!(?path, ?outcome, "handled closed file");
            Ok(())
        }
        Err(err) if !err.is_fatal() => {
            warn!(
                error = %err,
                "could not read file (already sent, deleted concurrently, or not fully written)"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}
