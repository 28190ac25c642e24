use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fileshipper::engine::Shutdown;
use fileshipper::errors::{Result, ShipperError};
use fileshipper::watch::{WatchEvent, WatchEventKind, WatchFacility, WatchHandle};

/// One step of the script. Events are addressed by directory rather than
/// handle so tests do not need to predict handle numbers.
enum Step {
    Event {
        dir: PathBuf,
        kind: WatchEventKind,
        name: OsString,
    },
    /// Runs when reached, before the next event is delivered.
    Action(Box<dyn FnOnce() + Send>),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Event { dir, kind, name } => f
                .debug_struct("Event")
                .field("dir", dir)
                .field("kind", kind)
                .field("name", name)
                .finish(),
            Step::Action(_) => f.write_str("Action"),
        }
    }
}

/// In-memory [`WatchFacility`].
///
/// Handles are numbered from 1 and never reused. Scripted events resolve to
/// the handle currently watching their directory, or to a handle nobody
/// holds if the directory is not watched. Once the script is drained, the
/// attached [`Shutdown`] (if any) is requested.
#[derive(Debug, Default)]
pub struct ScriptedFacility {
    script: VecDeque<Step>,
    watched: BTreeMap<WatchHandle, PathBuf>,
    next_handle: u64,
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// `add_watch` fails for these directories.
    pub refuse: Vec<PathBuf>,
    shutdown_when_drained: Option<Shutdown>,
}

impl ScriptedFacility {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Self::default()
        }
    }

    pub fn shutdown_when_drained(mut self, shutdown: Shutdown) -> Self {
        self.shutdown_when_drained = Some(shutdown);
        self
    }

    pub fn push_directory_created(&mut self, dir: impl Into<PathBuf>, name: &str) {
        self.push(dir.into(), WatchEventKind::DirectoryCreated, name);
    }

    pub fn push_file_closed(&mut self, dir: impl Into<PathBuf>, name: &str) {
        self.push(dir.into(), WatchEventKind::FileClosed, name);
    }

    /// Run `action` (e.g. create files) when the script reaches this point.
    pub fn push_action(&mut self, action: impl FnOnce() + Send + 'static) {
        self.script.push_back(Step::Action(Box::new(action)));
    }

    fn push(&mut self, dir: PathBuf, kind: WatchEventKind, name: &str) {
        self.script.push_back(Step::Event {
            dir,
            kind,
            name: name.into(),
        });
    }

    pub fn handle_for(&self, dir: &Path) -> Option<WatchHandle> {
        self.watched
            .iter()
            .find(|(_, watched)| watched.as_path() == dir)
            .map(|(handle, _)| *handle)
    }

    /// Directories currently watched, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watched.values().cloned().collect();
        dirs.sort();
        dirs
    }
}

impl WatchFacility for ScriptedFacility {
    fn add_watch(&mut self, dir: &Path) -> Result<WatchHandle> {
        if self.refuse.iter().any(|r| r == dir) {
            return Err(ShipperError::WatchError(notify::Error::generic(
                "watch refused by test",
            )));
        }
        let handle = WatchHandle(self.next_handle.max(1));
        self.next_handle = handle.0 + 1;
        self.watched.insert(handle, dir.to_path_buf());
        self.added.push(dir.to_path_buf());
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> Result<()> {
        match self.watched.remove(&handle) {
            Some(dir) => {
                self.removed.push(dir);
                Ok(())
            }
            None => Err(ShipperError::Other(anyhow::anyhow!(
                "unknown watch handle {handle}"
            ))),
        }
    }

    fn next_event(&mut self, _timeout: Duration) -> Result<Option<WatchEvent>> {
        loop {
            match self.script.pop_front() {
                Some(Step::Action(action)) => action(),
                Some(Step::Event { dir, kind, name }) => {
                    let handle = self.handle_for(&dir).unwrap_or(WatchHandle(u64::MAX));
                    return Ok(Some(WatchEvent { handle, kind, name }));
                }
                None => {
                    if let Some(shutdown) = &self.shutdown_when_drained {
                        shutdown.request();
                    }
                    return Ok(None);
                }
            }
        }
    }
}
