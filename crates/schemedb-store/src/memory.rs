//! In-memory store for tests and headless validation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use schemedb_core::{Error, FileStore};

/// A [`FileStore`] held entirely in memory.
///
/// Writes create any missing parent directories, mirroring
/// [`crate::LocalStore`] behavior closely enough for path-kind
/// validation tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    directories: RwLock<HashSet<PathBuf>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files held.
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    fn record_parents(&self, path: &Path) {
        let mut directories = self.directories.write();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            directories.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

impl FileStore for MemoryStore {
    fn file_exists(&self, path: &Path) -> Result<(), Error> {
        if self.files.read().contains_key(path) {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "file '{}' does not exist",
                path.display()
            )))
        }
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.directories.read().contains(path)
    }

    fn create_directory(&self, path: &Path) -> Result<(), Error> {
        self.directories.write().insert(path.to_path_buf());
        self.record_parents(path);
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("cannot read '{}'", path.display())))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), Error> {
        self.record_parents(path);
        self.files.write().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
