//! Storage collaborators for schemedb.
//!
//! The engine consumes storage through the [`schemedb_core::FileStore`]
//! trait; this crate supplies the concrete implementations and the file
//! formats that ride on them: a local-filesystem store, an in-memory
//! store for tests and headless validation, a JSON codec for tables, and
//! the project manifest mapping table names to import paths.

mod codec;
mod local;
mod manifest;
mod memory;

pub use codec::{from_json_bytes, load_table, save_table, to_json_bytes};
pub use local::LocalStore;
pub use manifest::{Manifest, ManifestEntry};
pub use memory::MemoryStore;
