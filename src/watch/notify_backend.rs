// src/watch/notify_backend.rs

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::anyhow;
use notify::event::{AccessKind, AccessMode, CreateKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::facility::{WatchEvent, WatchEventKind, WatchFacility, WatchHandle};

/// [`WatchFacility`] backed by the `notify` crate.
///
/// Every live directory gets its own non-recursive watch. `notify` reports
/// absolute paths, so events are mapped back to the handle of the directory
/// that contains them.
pub struct NotifyFacility {
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    pending: VecDeque<WatchEvent>,
    by_path: HashMap<PathBuf, WatchHandle>,
    by_handle: HashMap<WatchHandle, PathBuf>,
    next_handle: u64,
}

impl std::fmt::Debug for NotifyFacility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyFacility")
            .field("watched", &self.by_handle)
            .finish_non_exhaustive()
    }
}

impl NotifyFacility {
    /// Create the watcher. `event_buffer` is the initial capacity of the
    /// queue of translated events.
    ///
    /// Raw notifications go through an unbounded channel: the callback runs
    /// on notify's own thread, which also services `watch`/`unwatch`, so it
    /// must never block while the event loop is busy (e.g. during a backfill).
    pub fn new(event_buffer: usize) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is only gone during shutdown.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            events: event_rx,
            pending: VecDeque::with_capacity(event_buffer),
            by_path: HashMap::new(),
            by_handle: HashMap::new(),
            next_handle: 1,
        })
    }

    fn translate(&self, event: Event) -> Vec<WatchEvent> {
        let kind = match event.kind {
            EventKind::Create(CreateKind::Folder) => Some(WatchEventKind::DirectoryCreated),
            // Backends that cannot tell files from folders at creation time.
            EventKind::Create(CreateKind::Any | CreateKind::Other) => None,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                Some(WatchEventKind::FileClosed)
            }
            _ => return Vec::new(),
        };

        let mut out = Vec::new();
        for path in event.paths {
            let kind = match kind {
                Some(kind) => kind,
                None if path.is_dir() => WatchEventKind::DirectoryCreated,
                None => continue,
            };
            let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
                continue;
            };
            match self.by_path.get(parent) {
                Some(&handle) => out.push(WatchEvent {
                    handle,
                    kind,
                    name: name.to_os_string(),
                }),
                None => debug!(?path, "event outside any watched directory"),
            }
        }
        out
    }
}

impl WatchFacility for NotifyFacility {
    fn add_watch(&mut self, dir: &Path) -> Result<WatchHandle> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let handle = WatchHandle(self.next_handle);
        self.next_handle += 1;

        if let Some(old) = self.by_path.insert(dir.to_path_buf(), handle) {
            self.by_handle.remove(&old);
        }
        self.by_handle.insert(handle, dir.to_path_buf());

        info!(%handle, ?dir, "watching directory");
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> Result<()> {
        let Some(dir) = self.by_handle.remove(&handle) else {
            return Err(anyhow!("unknown watch handle {handle}").into());
        };
        self.by_path.remove(&dir);
        info!(%handle, ?dir, "unwatching directory");
        self.watcher.unwatch(&dir)?;
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<WatchEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        match self.events.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                debug!(?event, "received notify event");
                let translated = self.translate(event);
                self.pending.extend(translated);
                Ok(self.pending.pop_front())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "file watch error");
                Ok(None)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("watch event channel closed").into()),
        }
    }
}
