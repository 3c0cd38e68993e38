//! Catalog manager for the set of currently loaded tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{apply_all, Error, FailureMode};
use crate::store::FileStore;
use crate::table::Table;
use crate::value::{PathPolicy, ReferenceKind, Value, ValueContext, ValueKind};

/// The set of currently loaded tables, keyed by name.
///
/// The catalog is the single shared mutable resource of the engine.
/// Structural changes (load, unload, rename cascades) serialize behind
/// one lock, so a cascade always sees a stable snapshot of the loaded
/// tables while it runs.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, Table>>,
    paths: Option<PathPolicy>,
    store: Option<Arc<dyn FileStore>>,
}

impl Catalog {
    /// Create an empty catalog with no collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the path policy used by file and folder kinds.
    pub fn with_paths(mut self, paths: PathPolicy) -> Self {
        self.paths = Some(paths);
        self
    }

    /// Attach the file store used for path existence checks.
    pub fn with_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn context<'a>(&'a self, view: &'a HashMap<String, Table>) -> ValueContext<'a> {
        let mut ctx = ValueContext::bare().with_tables(view);
        if let Some(paths) = &self.paths {
            ctx = ctx.with_paths(paths);
        }
        if let Some(store) = &self.store {
            ctx = ctx.with_store(store.as_ref());
        }
        ctx
    }

    /// A snapshot of the loaded tables.
    pub(crate) fn snapshot(&self) -> HashMap<String, Table> {
        self.tables.read().clone()
    }

    /// Load a table, re-validating and auto-converting every row value
    /// against its attribute's kind.
    ///
    /// References resolve against the already-loaded tables plus the
    /// incoming one, so self-referencing tables load. Replaces any
    /// previously loaded table with the same name. On failure the
    /// catalog is unchanged.
    #[instrument(skip(self, table), fields(table = %table.name()))]
    pub fn load(&self, table: Table) -> Result<(), Error> {
        if table.name().trim().is_empty() {
            return Err(Error::Structural(
                "table name must not be blank".to_string(),
            ));
        }

        let mut tables = self.tables.write();
        let mut incoming = table;

        // Convert against a view that already contains the incoming
        // table, so self-references resolve.
        let mut view = tables.clone();
        view.insert(incoming.name().to_string(), incoming.clone());
        incoming.convert_all_with(&self.context(&view))?;

        // Validate against the converted state.
        view.insert(incoming.name().to_string(), incoming.clone());
        incoming.validate_with(&self.context(&view))?;

        let rows = incoming.entry_count();
        tables.insert(incoming.name().to_string(), incoming);
        info!(rows, "table loaded");
        Ok(())
    }

    /// Unload a table.
    ///
    /// Values in other tables that referenced it are not rewritten or
    /// invalidated here; they become orphaned and fail the next
    /// validation run against the missing target.
    pub fn unload(&self, name: &str) -> Result<Table, Error> {
        let removed = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("table '{}' is not loaded", name)))?;
        info!(table = %name, "table unloaded");
        Ok(removed)
    }

    /// Get a cloned snapshot of a loaded table.
    pub fn get(&self, name: &str) -> Option<Table> {
        self.tables.read().get(name).cloned()
    }

    /// Check if a table is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Names of all loaded tables, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of loaded tables.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Check if no tables are loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Build a reference kind pointing at a table's identifier attribute.
    ///
    /// Fails when the table is not loaded, when the attribute is missing,
    /// or when it is not the table's identifier.
    pub fn create_reference(
        &self,
        table: &str,
        attribute: &str,
        allow_empty: bool,
    ) -> Result<ValueKind, Error> {
        let tables = self.tables.read();
        let target = tables.get(table).ok_or_else(|| {
            Error::ReferentialIntegrity(format!("table '{}' is not loaded in the catalog", table))
        })?;
        let identifier = target.identifier_attribute().ok_or_else(|| {
            Error::ReferentialIntegrity(format!(
                "table '{}' has no identifier attribute",
                table
            ))
        })?;
        if identifier.name != attribute {
            return Err(Error::ReferentialIntegrity(format!(
                "'{}' is not the identifier attribute of table '{}'",
                attribute, table
            )));
        }

        let mut reference = ReferenceKind::new(table, attribute);
        if allow_empty {
            reference = reference.with_allow_empty();
        }
        Ok(ValueKind::Reference(reference))
    }

    /// The default value for a reference kind: the target table's first
    /// identifier value, or null when the target is missing or empty.
    pub fn reference_default(&self, reference: &ReferenceKind) -> Value {
        self.tables
            .read()
            .get(&reference.table)
            .and_then(|table| table.get_raw_identifier_values().into_iter().next())
            .unwrap_or(Value::Null)
    }

    /// Rename an identifier value and cascade the rename into every
    /// loaded table that references it.
    ///
    /// Fails when no row holds `old_value`, or when another row already
    /// holds `new_value`. On success every matching reference value in
    /// every *other* table is rewritten, and the count of rewritten
    /// values is returned. Propagation is single-hop: only direct
    /// referrers of the renamed table are touched.
    #[instrument(skip(self, old_value, new_value), fields(table = %table_name, attribute = %attribute_name))]
    pub fn update_identifier_value(
        &self,
        table_name: &str,
        attribute_name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> Result<usize, Error> {
        let mut tables = self.tables.write();

        {
            let target = tables.get_mut(table_name).ok_or_else(|| {
                Error::NotFound(format!("table '{}' is not loaded", table_name))
            })?;
            if target.get_attribute(attribute_name).is_none() {
                return Err(Error::NotFound(format!(
                    "table '{}' has no attribute '{}'",
                    table_name, attribute_name
                )));
            }
            let row = target.find_entry(attribute_name, old_value).ok_or_else(|| {
                Error::NotFound(format!(
                    "no row in '{}' has {} = '{}'",
                    table_name, attribute_name, old_value
                ))
            })?;
            if target.find_entry(attribute_name, new_value).is_some() {
                return Err(Error::ReferentialIntegrity(format!(
                    "table '{}' already has a row with {} = '{}'",
                    table_name, attribute_name, new_value
                )));
            }
            target.write_slot(row, attribute_name, new_value.clone());
        }

        let mut rewritten = 0usize;
        for (name, table) in tables.iter_mut() {
            if name == table_name {
                continue;
            }

            let referencing: Vec<String> = table
                .attributes()
                .iter()
                .filter(|a| {
                    a.kind.reference_target().is_some_and(|r| {
                        r.table == table_name && r.attribute == attribute_name
                    })
                })
                .map(|a| a.name.clone())
                .collect();

            for attribute in referencing {
                for index in 0..table.entry_count() {
                    let matches = table
                        .entry(index)
                        .and_then(|row| row.get(&attribute))
                        .is_some_and(|value| value == old_value);
                    if matches {
                        table.write_slot(index, &attribute, new_value.clone());
                        rewritten += 1;
                    }
                }
                debug!(table = %name, attribute = %attribute, "scanned referencing attribute");
            }
        }

        info!(rewritten, "identifier rename cascaded");
        Ok(rewritten)
    }

    /// Atomically convert an attribute's kind, with references and paths
    /// resolving against the loaded tables.
    pub fn convert_attribute_type(
        &self,
        table_name: &str,
        attribute: &str,
        new_kind: ValueKind,
    ) -> Result<(), Error> {
        let mut tables = self.tables.write();
        let view = tables.clone();
        let ctx = self.context(&view);

        let table = tables.get_mut(table_name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' is not loaded", table_name))
        })?;
        table.convert_attribute_type_with(attribute, new_kind, &ctx)
    }

    /// Fully validate one loaded table, references included.
    pub fn validate_table(&self, name: &str) -> Result<(), Error> {
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("table '{}' is not loaded", name)))?;
        table.validate_with(&self.context(&tables))
    }

    /// Validate every loaded table, honoring the failure mode.
    pub fn validate_all(&self, mode: FailureMode) -> Result<(), Error> {
        let tables = self.tables.read();
        let ctx = self.context(&tables);

        let mut names: Vec<&String> = tables.keys().collect();
        names.sort();
        apply_all(names, mode, |name| tables[name].validate_with(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeDef;
    use crate::row::Row;

    fn reward_types() -> Table {
        let mut table = Table::new("RewardTypes");
        table
            .add_attribute(AttributeDef::new("Name", ValueKind::Text).identifier())
            .unwrap();
        for name in ["GOLD", "SILVER", "COPPER"] {
            table
                .add_entry(Row::new().with("Name", name).unwrap())
                .unwrap();
        }
        table
    }

    fn loot_rolls() -> Table {
        let mut table = Table::new("LootRolls");
        table
            .add_attribute(AttributeDef::new(
                "RewardType",
                ValueKind::reference("RewardTypes", "Name"),
            ))
            .unwrap();
        table
            .add_attribute(AttributeDef::new("Amount", ValueKind::Integer))
            .unwrap();
        for (reward, amount) in [("GOLD", 100i64), ("SILVER", 50)] {
            table
                .add_entry(
                    Row::new()
                        .with("RewardType", reward)
                        .unwrap()
                        .with("Amount", amount)
                        .unwrap(),
                )
                .unwrap();
        }
        table
    }

    fn loaded_catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog.load(reward_types()).unwrap();
        catalog.load(loot_rolls()).unwrap();
        catalog
    }

    #[test]
    fn test_load_and_get() {
        let catalog = loaded_catalog();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("RewardTypes"));
        assert_eq!(
            catalog.list_names(),
            vec!["LootRolls".to_string(), "RewardTypes".to_string()]
        );

        let table = catalog.get("RewardTypes").unwrap();
        assert_eq!(table.entry_count(), 3);
        assert!(catalog.get("Missing").is_none());
    }

    #[test]
    fn test_load_blank_name_fails() {
        let catalog = Catalog::new();
        assert!(catalog.load(Table::new("  ")).is_err());
    }

    #[test]
    fn test_load_auto_converts_rows() {
        let mut table = Table::new("Stats");
        table
            .add_attribute(AttributeDef::new("Power", ValueKind::Integer))
            .unwrap();
        // Plant a raw textual value the way a deserialized file would;
        // load coerces it to the attribute's kind.
        table.add_entry(Row::new()).unwrap();
        table.write_slot(0, "Power", Value::from("42"));

        let catalog = Catalog::new();
        catalog.load(table).unwrap();

        let loaded = catalog.get("Stats").unwrap();
        assert_eq!(loaded.entry(0).unwrap().get("Power"), Some(&Value::Integer(42)));
    }

    #[test]
    fn test_load_fills_missing_slots_with_defaults() {
        let mut table = Table::new("Stats");
        table
            .add_attribute(AttributeDef::new("Power", ValueKind::Integer).with_default(7i64))
            .unwrap();
        table.add_entry(Row::new()).unwrap();

        let catalog = Catalog::new();
        catalog.load(table).unwrap();

        let loaded = catalog.get("Stats").unwrap();
        assert_eq!(loaded.entry(0).unwrap().get("Power"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_load_rejects_dangling_reference() {
        let catalog = Catalog::new();
        let result = catalog.load(loot_rolls());
        assert!(matches!(result, Err(Error::ReferentialIntegrity(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_self_referencing_table() {
        let mut table = Table::new("Categories");
        table
            .add_attribute(AttributeDef::new("Id", ValueKind::Text).identifier())
            .unwrap();
        table
            .add_attribute(AttributeDef::new(
                "Parent",
                ValueKind::Reference(
                    ReferenceKind::new("Categories", "Id").with_allow_empty(),
                ),
            ))
            .unwrap();
        table
            .add_entry(Row::new().with("Id", "ROOT").unwrap())
            .unwrap();
        table
            .add_entry(
                Row::new()
                    .with("Id", "WEAPONS")
                    .unwrap()
                    .with("Parent", "ROOT")
                    .unwrap(),
            )
            .unwrap();

        let catalog = Catalog::new();
        catalog.load(table).unwrap();
        assert!(catalog.validate_table("Categories").is_ok());
    }

    #[test]
    fn test_unload_is_lazy() {
        let catalog = loaded_catalog();

        catalog.unload("RewardTypes").unwrap();
        assert!(!catalog.contains("RewardTypes"));

        // The referencing table still holds the orphaned values; only
        // the next validation run notices.
        let result = catalog.validate_table("LootRolls");
        assert!(matches!(result, Err(Error::ReferentialIntegrity(_))));

        assert!(matches!(
            catalog.unload("RewardTypes"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_deleting_identifier_orphans_references_lazily() {
        let catalog = loaded_catalog();

        // Edit the target outside the catalog and load the result back;
        // the referencing table is not revisited at that point.
        let mut rewards = catalog.unload("RewardTypes").unwrap();
        rewards.remove_attribute("Name").unwrap();
        catalog.load(rewards).unwrap();

        // Only the next validation run notices the orphaned values.
        let result = catalog.validate_table("LootRolls");
        match result {
            Err(Error::ReferentialIntegrity(message)) => {
                assert!(message.contains("identifier"));
            }
            other => panic!("Expected ReferentialIntegrity, got {:?}", other),
        }
    }

    #[test]
    fn test_cascading_identifier_rename() {
        let catalog = loaded_catalog();

        let rewritten = catalog
            .update_identifier_value(
                "RewardTypes",
                "Name",
                &Value::from("GOLD"),
                &Value::from("PLATINUM"),
            )
            .unwrap();
        assert_eq!(rewritten, 1);

        let rewards = catalog.get("RewardTypes").unwrap();
        assert_eq!(
            rewards.get_identifier_values(),
            vec!["PLATINUM", "SILVER", "COPPER"]
        );

        let rolls = catalog.get("LootRolls").unwrap();
        let reward_values: Vec<String> = rolls
            .entries()
            .iter()
            .map(|row| row.get_text("RewardType"))
            .collect();
        assert!(!reward_values.contains(&"GOLD".to_string()));
        assert_eq!(
            reward_values
                .iter()
                .filter(|v| v.as_str() == "PLATINUM")
                .count(),
            1
        );

        assert!(catalog.validate_all(FailureMode::HaltOnFirst).is_ok());
    }

    #[test]
    fn test_rename_missing_row_fails() {
        let catalog = loaded_catalog();
        let result = catalog.update_identifier_value(
            "RewardTypes",
            "Name",
            &Value::from("DIAMOND"),
            &Value::from("RUBY"),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rename_collision_fails_without_changes() {
        let catalog = loaded_catalog();
        let result = catalog.update_identifier_value(
            "RewardTypes",
            "Name",
            &Value::from("GOLD"),
            &Value::from("SILVER"),
        );
        assert!(matches!(result, Err(Error::ReferentialIntegrity(_))));

        let rewards = catalog.get("RewardTypes").unwrap();
        assert_eq!(
            rewards.get_identifier_values(),
            vec!["GOLD", "SILVER", "COPPER"]
        );
    }

    #[test]
    fn test_create_reference() {
        let catalog = loaded_catalog();

        let kind = catalog
            .create_reference("RewardTypes", "Name", false)
            .unwrap();
        assert_eq!(kind, ValueKind::reference("RewardTypes", "Name"));

        assert!(catalog.create_reference("Missing", "Name", false).is_err());
        assert!(catalog
            .create_reference("RewardTypes", "Bogus", false)
            .is_err());
        // LootRolls has no identifier attribute at all.
        assert!(catalog
            .create_reference("LootRolls", "RewardType", false)
            .is_err());
    }

    #[test]
    fn test_reference_default() {
        let catalog = loaded_catalog();

        let reference = ReferenceKind::new("RewardTypes", "Name");
        assert_eq!(catalog.reference_default(&reference), Value::from("GOLD"));

        let dangling = ReferenceKind::new("Missing", "Name");
        assert_eq!(catalog.reference_default(&dangling), Value::Null);
    }

    #[test]
    fn test_catalog_convert_attribute_type() {
        let catalog = loaded_catalog();

        catalog
            .convert_attribute_type("LootRolls", "Amount", ValueKind::Float)
            .unwrap();

        let rolls = catalog.get("LootRolls").unwrap();
        assert_eq!(
            rolls.get_attribute("Amount").unwrap().kind,
            ValueKind::Float
        );
        assert_eq!(
            rolls.entry(0).unwrap().get("Amount"),
            Some(&Value::from(100.0))
        );
    }

    #[test]
    fn test_validate_all_collects_failures() {
        let catalog = loaded_catalog();
        catalog.unload("RewardTypes").unwrap();

        let result = catalog.validate_all(FailureMode::CollectAll);
        match result {
            Err(Error::Aggregate { failed, total, .. }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 1);
            }
            other => panic!("Expected Aggregate, got {:?}", other),
        }
    }
}
