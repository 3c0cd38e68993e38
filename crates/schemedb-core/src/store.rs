//! The injected file-system collaborator.

use std::path::Path;

use crate::error::Error;

/// File-system abstraction the engine consumes.
///
/// Path value kinds check existence through this trait during validation,
/// and the storage adapters drive it for table and manifest payloads. The
/// engine never touches the real file system directly, so tests and
/// headless runs can substitute an in-memory implementation.
pub trait FileStore: Send + Sync {
    /// Succeeds when a file exists at `path`; fails with the reason
    /// otherwise.
    fn file_exists(&self, path: &Path) -> Result<(), Error>;

    /// Check whether a directory exists at `path`.
    fn directory_exists(&self, path: &Path) -> bool;

    /// Create a directory (and any missing parents) at `path`.
    fn create_directory(&self, path: &Path) -> Result<(), Error>;

    /// Read the file at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>, Error>;

    /// Write `bytes` to the file at `path`, replacing any existing
    /// content.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), Error>;
}
