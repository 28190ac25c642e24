// src/fs/mod.rs

use std::ffi::OsString;
use std::fmt::{self, Debug};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, warn};

pub mod mock;

/// What a directory entry turned out to be after following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// A file opened for shipping, with its size taken at open time.
pub struct OpenedFile {
    pub reader: Box<dyn Read + Send>,
    pub len: u64,
}

impl Debug for OpenedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedFile").field("len", &self.len).finish()
    }
}

/// Abstract filesystem interface.
///
/// Methods return `std::io::Result` because callers classify failures by
/// `io::ErrorKind` (e.g. "directory not empty" during cleanup).
pub trait FileSystem: Send + Sync + Debug {
    /// Names of the entries in a directory, without `.` and `..`.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
    fn open_read(&self, path: &Path) -> io::Result<OpenedFile>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name());
        }
        Ok(names)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = fs::metadata(path)?;
        Ok(if meta.is_dir() {
            EntryKind::Directory
        } else if meta.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    fn open_read(&self, path: &Path) -> io::Result<OpenedFile> {
        let file = fs::File::open(path)?;
        let len = file.metadata()?.len();
        Ok(OpenedFile {
            reader: Box::new(file),
            len,
        })
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

/// Remove a directory if possible; failures are only logged.
///
/// Returns whether the directory is gone.
pub fn remove_dir_best_effort(fs: &dyn FileSystem, path: &Path) -> bool {
    match fs.remove_dir(path) {
        Ok(()) => {
            debug!(?path, "removed directory");
            true
        }
        Err(err) if is_not_empty(&err) => {
            warn!(?path, "directory not removed: still contains files");
            false
        }
        Err(err) => {
            warn!(?path, error = %err, "directory not removed: no permissions or directory in use");
            false
        }
    }
}

fn is_not_empty(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::AlreadyExists
    )
}
