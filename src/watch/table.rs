// src/watch/table.rs

//! Per-depth record of the directories currently being watched.
//!
//! Depth 0 is the root directory given on the command line. Each deeper
//! active slot names a direct child of the slot above it, so the active
//! slots always form a single chain: the "live" branch of the tree.
//!
//! The table performs no IO. Re-rooting is split in two: the table decides
//! what to detach and where the new directory goes ([`WatchTable::begin_reroot`]),
//! and the caller releases the detached watches and installs the new one.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, ShipperError};
use crate::watch::facility::WatchHandle;

/// An active watch at one depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSlot {
    pub handle: WatchHandle,
    pub path: PathBuf,
}

/// Result of [`WatchTable::begin_reroot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reroot {
    /// No active slot carries the event's handle (e.g. it was just removed).
    UnknownHandle,
    /// The new directory would sit below the deepest tracked level.
    TooDeep { depth: usize },
    /// The directory is already the live slot at its depth.
    Duplicate { depth: usize, path: PathBuf },
    /// The directory supersedes everything at `depth` and below. The slots in
    /// `detached` (deepest first) have already been removed from the table;
    /// the caller must release their handles and install `path` at `depth`.
    Replace {
        depth: usize,
        path: PathBuf,
        detached: Vec<(usize, WatchSlot)>,
    },
}

/// Fixed-capacity table of watch slots, indexed by depth `0..=max_depth`.
#[derive(Debug, Clone)]
pub struct WatchTable {
    slots: Vec<Option<WatchSlot>>,
}

impl WatchTable {
    pub fn new(max_depth: usize) -> Self {
        Self {
            slots: vec![None; max_depth + 1],
        }
    }

    pub fn max_depth(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn slot(&self, depth: usize) -> Option<&WatchSlot> {
        self.slots.get(depth).and_then(|s| s.as_ref())
    }

    /// Active slots, shallowest first.
    pub fn active(&self) -> impl Iterator<Item = (usize, &WatchSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(depth, slot)| slot.as_ref().map(|s| (depth, s)))
    }

    /// The deepest active slot; the only one whose files get shipped on
    /// close-write.
    pub fn deepest(&self) -> Option<(usize, &WatchSlot)> {
        self.active().last()
    }

    /// Depth of the deepest active slot carrying `handle`.
    pub fn depth_of(&self, handle: WatchHandle) -> Option<usize> {
        self.active()
            .filter(|(_, slot)| slot.handle == handle)
            .map(|(depth, _)| depth)
            .last()
    }

    /// Install the root watch at depth 0.
    pub fn install_root(&mut self, handle: WatchHandle, path: impl Into<PathBuf>) -> Result<()> {
        if self.slots[0].is_some() {
            return Err(ShipperError::WatchTable(
                "root slot is already active".to_string(),
            ));
        }
        self.slots[0] = Some(WatchSlot {
            handle,
            path: path.into(),
        });
        Ok(())
    }

    /// Install a watch at `depth >= 1`.
    ///
    /// The slot must be vacant and `path` must be a direct child of the
    /// active slot one level up.
    pub fn install(
        &mut self,
        depth: usize,
        handle: WatchHandle,
        path: impl Into<PathBuf>,
    ) -> Result<()> {
        let path = path.into();

        if depth == 0 || depth > self.max_depth() {
            return Err(ShipperError::WatchTable(format!(
                "depth {} outside 1..={}",
                depth,
                self.max_depth()
            )));
        }
        if let Some(existing) = &self.slots[depth] {
            return Err(ShipperError::WatchTable(format!(
                "depth {} already watches {:?}",
                depth, existing.path
            )));
        }
        let Some(parent) = &self.slots[depth - 1] else {
            return Err(ShipperError::WatchTable(format!(
                "no active parent at depth {} for {:?}",
                depth - 1,
                path
            )));
        };
        if path.parent() != Some(parent.path.as_path()) {
            return Err(ShipperError::WatchTable(format!(
                "{:?} is not a direct child of {:?}",
                path, parent.path
            )));
        }

        debug!(depth, %handle, ?path, "installed watch slot");
        self.slots[depth] = Some(WatchSlot { handle, path });
        Ok(())
    }

    /// Remove every active slot at `depth` and below, deepest first.
    pub fn detach_from(&mut self, depth: usize) -> Vec<(usize, WatchSlot)> {
        let mut detached = Vec::new();
        for d in (depth..self.slots.len()).rev() {
            if let Some(slot) = self.slots[d].take() {
                detached.push((d, slot));
            }
        }
        detached
    }

    /// Decide how a "directory `name` created" event on `handle` changes
    /// the table.
    pub fn begin_reroot(&mut self, handle: WatchHandle, name: &OsStr) -> Reroot {
        let Some(parent_depth) = self.depth_of(handle) else {
            return Reroot::UnknownHandle;
        };

        let depth = parent_depth + 1;
        if depth > self.max_depth() {
            return Reroot::TooDeep { depth };
        }

        let Some(parent) = &self.slots[parent_depth] else {
            return Reroot::UnknownHandle;
        };
        let path = parent.path.join(name);

        if self.slot(depth).is_some_and(|slot| slot.path == path) {
            return Reroot::Duplicate { depth, path };
        }

        let detached = self.detach_from(depth);
        Reroot::Replace {
            depth,
            path,
            detached,
        }
    }

    /// Check the chain invariants. Every mutator already enforces them; this
    /// exists for tests and debug assertions.
    pub fn verify(&self) -> Result<()> {
        let mut previous: Option<&Path> = None;
        for (depth, slot) in self.slots.iter().enumerate() {
            match (slot, previous) {
                (Some(slot), Some(parent)) if slot.path.parent() != Some(parent) => {
                    return Err(ShipperError::WatchTable(format!(
                        "slot {} ({:?}) is not a child of {:?}",
                        depth, slot.path, parent
                    )));
                }
                (Some(slot), None) if depth > 0 => {
                    return Err(ShipperError::WatchTable(format!(
                        "slot {} ({:?}) has no active parent",
                        depth, slot.path
                    )));
                }
                _ => {}
            }
            previous = slot.as_ref().map(|s| s.path.as_path());
        }
        Ok(())
    }
}
