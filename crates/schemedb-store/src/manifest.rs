//! The project manifest: which storage path backs each table, and how it
//! publishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use schemedb_core::{Error, FileStore};

/// Per-table import record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Storage path of the table payload.
    pub path: PathBuf,
    /// Whether publish tooling exports this table.
    pub publish: bool,
}

impl ManifestEntry {
    /// Create a published entry for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            publish: true,
        }
    }

    /// Set the publish flag.
    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }
}

/// The project manifest, mapping table names to their import records.
///
/// Entries are kept sorted by table name so the serialized form is
/// stable under round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a table.
    pub fn set_entry(&mut self, table: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(table.into(), entry);
    }

    /// Get the entry for a table.
    pub fn entry(&self, table: &str) -> Option<&ManifestEntry> {
        self.entries.get(table)
    }

    /// Remove the entry for a table.
    pub fn remove_entry(&mut self, table: &str) -> Option<ManifestEntry> {
        self.entries.remove(table)
    }

    /// Table names in the manifest, sorted.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the manifest through a [`FileStore`].
    pub fn save(&self, store: &dyn FileStore, path: &Path) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Storage(format!("cannot serialize manifest: {}", e)))?;
        store.write(path, &bytes)?;
        debug!(entries = self.entries.len(), path = %path.display(), "manifest saved");
        Ok(())
    }

    /// Read a manifest through a [`FileStore`].
    pub fn load(store: &dyn FileStore, path: &Path) -> Result<Self, Error> {
        let bytes = store.read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Storage(format!("cannot deserialize manifest: {}", e)))
    }
}
