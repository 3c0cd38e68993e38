//! JSON codec for tables.

use std::path::Path;

use tracing::debug;

use schemedb_core::{Error, FileStore, Table};

/// Serialize a table to pretty-printed JSON.
pub fn to_json_bytes(table: &Table) -> Result<Vec<u8>, Error> {
    serde_json::to_vec_pretty(table)
        .map_err(|e| Error::Storage(format!("cannot serialize table '{}': {}", table.name(), e)))
}

/// Deserialize a table from JSON.
pub fn from_json_bytes(bytes: &[u8]) -> Result<Table, Error> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Storage(format!("cannot deserialize table: {}", e)))
}

/// Write a table through a [`FileStore`].
pub fn save_table(store: &dyn FileStore, path: &Path, table: &Table) -> Result<(), Error> {
    let bytes = to_json_bytes(table)?;
    store.write(path, &bytes)?;
    debug!(table = %table.name(), path = %path.display(), "table saved");
    Ok(())
}

/// Read a table through a [`FileStore`].
///
/// The result has not been validated against any catalog; load it into
/// one to re-validate and auto-convert its rows.
pub fn load_table(store: &dyn FileStore, path: &Path) -> Result<Table, Error> {
    let bytes = store.read(path)?;
    let table = from_json_bytes(&bytes)?;
    debug!(table = %table.name(), path = %path.display(), "table read");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use schemedb_core::{AttributeDef, Row, Value, ValueKind};

    fn sample_table() -> Table {
        let mut table = Table::new("Items");
        table
            .add_attribute(AttributeDef::new("Id", ValueKind::Text).identifier())
            .unwrap();
        table
            .add_attribute(
                AttributeDef::new("Cost", ValueKind::Integer).with_default(10i64),
            )
            .unwrap();
        table
            .add_attribute(AttributeDef::new("Tags", ValueKind::list(ValueKind::Text)))
            .unwrap();
        table
            .add_entry(
                Row::new()
                    .with("Id", "SWORD")
                    .unwrap()
                    .with("Cost", 100i64)
                    .unwrap()
                    .with(
                        "Tags",
                        vec![Value::from("melee"), Value::from("steel")],
                    )
                    .unwrap(),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_json_round_trip() {
        let table = sample_table();
        let bytes = to_json_bytes(&table).unwrap();
        let decoded = from_json_bytes(&bytes).unwrap();

        assert_eq!(table, decoded);
    }

    #[test]
    fn test_save_and_load_through_store() {
        let store = MemoryStore::new();
        let path = Path::new("schemes/items.json");
        let table = sample_table();

        save_table(&store, path, &table).unwrap();
        let loaded = load_table(&store, path).unwrap();

        assert_eq!(table, loaded);
    }

    #[test]
    fn test_malformed_payload_fails() {
        assert!(matches!(
            from_json_bytes(b"not json"),
            Err(Error::Storage(_))
        ));
    }
}
