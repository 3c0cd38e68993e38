//! The catalog of loaded tables.
//!
//! All reference resolution, cascading identifier renames, and
//! dependency-ordered sorting run against one catalog instance; there is
//! no process-wide registry.

mod catalog;
mod toposort;

pub use catalog::Catalog;
