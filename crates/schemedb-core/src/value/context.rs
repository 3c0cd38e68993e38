//! Collaborators available to value validation and conversion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::store::FileStore;
use crate::table::Table;

/// Path handling policy for the file and folder kinds.
///
/// When `relative` is set, absolute paths are rejected by strict
/// validation and rebased onto `base` by conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPolicy {
    /// Base directory that relative paths are resolved against.
    pub base: PathBuf,
    /// Whether stored paths must be relative to `base`.
    pub relative: bool,
}

impl PathPolicy {
    /// Create a policy rooted at the given base directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            relative: false,
        }
    }

    /// Require stored paths to be relative to the base directory.
    pub fn with_relative(mut self) -> Self {
        self.relative = true;
        self
    }

    /// Resolve a stored path against the base directory.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

/// Collaborators a value kind may need while validating or converting.
///
/// Scalar kinds validate with a bare context. Reference kinds need the
/// loaded-table view; the path kinds use the path policy and, when one is
/// supplied, the file store for existence checks.
#[derive(Clone, Copy, Default)]
pub struct ValueContext<'a> {
    tables: Option<&'a HashMap<String, Table>>,
    paths: Option<&'a PathPolicy>,
    store: Option<&'a dyn FileStore>,
}

impl<'a> ValueContext<'a> {
    /// A context with no collaborators.
    pub fn bare() -> Self {
        Self::default()
    }

    /// Attach the loaded-table view used by reference kinds.
    pub fn with_tables(mut self, tables: &'a HashMap<String, Table>) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Attach the path policy used by the file and folder kinds.
    pub fn with_paths(mut self, paths: &'a PathPolicy) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Attach the file store used for path existence checks.
    pub fn with_store(mut self, store: &'a dyn FileStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Look up a loaded table by name.
    pub(crate) fn table(&self, name: &str) -> Option<&'a Table> {
        self.tables.and_then(|tables| tables.get(name))
    }

    /// The path policy, if attached.
    pub(crate) fn paths(&self) -> Option<&'a PathPolicy> {
        self.paths
    }

    /// The file store, if attached.
    pub(crate) fn store(&self) -> Option<&'a dyn FileStore> {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_policy_resolve() {
        let policy = PathPolicy::new("/project/assets").with_relative();

        assert_eq!(
            policy.resolve("icons/sword.png"),
            PathBuf::from("/project/assets/icons/sword.png")
        );
        assert_eq!(
            policy.resolve("/already/absolute.png"),
            PathBuf::from("/already/absolute.png")
        );
    }

    #[test]
    fn test_bare_context_has_no_collaborators() {
        let ctx = ValueContext::bare();
        assert!(ctx.table("Items").is_none());
        assert!(ctx.paths().is_none());
        assert!(ctx.store().is_none());
    }
}
