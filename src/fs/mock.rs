// src/fs/mock.rs

use super::{EntryKind, FileSystem, OpenedFile};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    /// A file whose reported size is larger than what can actually be read,
    /// as if it was truncated after being opened.
    Truncated { declared_len: u64, content: Vec<u8> },
    /// A file that exists but cannot be opened.
    Unreadable,
    Dir,
    /// A directory whose listing fails.
    UnreadableDir,
}

/// In-memory filesystem keyed by absolute path.
///
/// Parent directories are created implicitly when entries are added.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), MockEntry::File(content.into()));
    }

    pub fn add_truncated_file(
        &self,
        path: impl AsRef<Path>,
        declared_len: u64,
        content: impl Into<Vec<u8>>,
    ) {
        self.insert(
            path.as_ref(),
            MockEntry::Truncated {
                declared_len,
                content: content.into(),
            },
        );
    }

    pub fn add_unreadable_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Unreadable);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir);
    }

    pub fn add_unreadable_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::UnreadableDir);
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.entries.lock().unwrap().contains_key(path.as_ref())
    }

    /// Every path currently present, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }
        entries.insert(path.to_path_buf(), entry);
    }

    fn children(entries: &BTreeMap<PathBuf, MockEntry>, dir: &Path) -> Vec<OsString> {
        entries
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{:?} not found", path))
}

impl FileSystem for MockFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir) => {
                // Reverse so callers cannot rely on the mock's key order.
                let mut names = Self::children(&entries, path);
                names.reverse();
                Ok(names)
            }
            Some(MockEntry::UnreadableDir) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot list {:?}", path),
            )),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{:?} is not a directory", path),
            )),
            None => Err(not_found(path)),
        }
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir | MockEntry::UnreadableDir) => Ok(EntryKind::Directory),
            Some(_) => Ok(EntryKind::File),
            None => Err(not_found(path)),
        }
    }

    fn open_read(&self, path: &Path) -> io::Result<OpenedFile> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File(content)) => Ok(OpenedFile {
                len: content.len() as u64,
                reader: Box::new(Cursor::new(content.clone())),
            }),
            Some(MockEntry::Truncated {
                declared_len,
                content,
            }) => Ok(OpenedFile {
                len: *declared_len,
                reader: Box::new(Cursor::new(content.clone())),
            }),
            Some(MockEntry::Unreadable) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot open {:?}", path),
            )),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{:?} is a directory", path),
            )),
            None => Err(not_found(path)),
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir | MockEntry::UnreadableDir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{:?} is a directory", path),
            )),
            Some(_) => {
                entries.remove(path);
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir | MockEntry::UnreadableDir) => {
                if !Self::children(&entries, path).is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::DirectoryNotEmpty,
                        format!("{:?} is not empty", path),
                    ));
                }
                entries.remove(path);
                Ok(())
            }
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{:?} is not a directory", path),
            )),
            None => Err(not_found(path)),
        }
    }
}
