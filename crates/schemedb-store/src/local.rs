//! Local-filesystem store.

use std::fs;
use std::path::Path;

use tracing::debug;

use schemedb_core::{Error, FileStore};

/// A [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl LocalStore {
    /// Create a local store.
    pub fn new() -> Self {
        LocalStore
    }
}

impl FileStore for LocalStore {
    fn file_exists(&self, path: &Path) -> Result<(), Error> {
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "file '{}' does not exist",
                path.display()
            )))
        }
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directory(&self, path: &Path) -> Result<(), Error> {
        fs::create_dir_all(path).map_err(|e| {
            Error::Storage(format!("cannot create directory '{}': {}", path.display(), e))
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        fs::read(path)
            .map_err(|e| Error::Storage(format!("cannot read '{}': {}", path.display(), e)))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                self.create_directory(parent)?;
            }
        }
        fs::write(path, bytes)
            .map_err(|e| Error::Storage(format!("cannot write '{}': {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
        Ok(())
    }
}
