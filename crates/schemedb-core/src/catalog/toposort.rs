//! Dependency-ordered sorting of tables by reference.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::Catalog;
use crate::error::Error;
use crate::table::Table;

impl Catalog {
    /// Order the loaded tables so that a referenced table always precedes
    /// its referrers.
    ///
    /// An edge A -> B exists when A holds an attribute whose reference
    /// kind targets B; self-references are excluded, so a self-referencing
    /// table does not depend on itself loading first. Ties break by name,
    /// making the order deterministic. A genuine multi-table cycle is an
    /// [`Error::CycleDetected`] naming the tables still in the cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, Error> {
        sort_tables(&self.snapshot())
    }
}

/// Kahn's algorithm over the reference graph.
pub(crate) fn sort_tables(tables: &HashMap<String, Table>) -> Result<Vec<String>, Error> {
    // Remaining tables with their unresolved dependencies. Edges to
    // tables not in the catalog cannot constrain the order and are
    // dropped here; validation reports them separately.
    let mut pending: BTreeMap<&str, BTreeSet<&str>> = tables
        .iter()
        .map(|(name, table)| {
            let deps: BTreeSet<&str> = table
                .attributes()
                .iter()
                .filter_map(|a| a.kind.reference_target())
                .filter(|r| r.table != *name && tables.contains_key(&r.table))
                .map(|r| r.table.as_str())
                .collect();
            (name.as_str(), deps)
        })
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if ready.is_empty() {
            let remaining: Vec<&str> = pending.keys().copied().collect();
            return Err(Error::CycleDetected(remaining.join(", ")));
        }

        for name in &ready {
            pending.remove(name);
            order.push((*name).to_string());
        }
        for deps in pending.values_mut() {
            for name in &ready {
                deps.remove(name);
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeDef;
    use crate::row::Row;
    use crate::value::{ReferenceKind, ValueKind};

    fn identifier_table(name: &str, ids: &[&str]) -> Table {
        let mut table = Table::new(name);
        table
            .add_attribute(AttributeDef::new("Id", ValueKind::Text).identifier())
            .unwrap();
        for id in ids {
            table
                .add_entry(Row::new().with("Id", *id).unwrap())
                .unwrap();
        }
        table
    }

    fn add_reference(table: &mut Table, attribute: &str, target: &str) {
        table
            .add_attribute(AttributeDef::new(
                attribute,
                ValueKind::Reference(ReferenceKind::new(target, "Id").with_allow_empty()),
            ))
            .unwrap();
    }

    #[test]
    fn test_referenced_tables_come_first() {
        let catalog = Catalog::new();

        // A references itself; B references A; C references A and B;
        // D references nothing.
        let mut a = identifier_table("A", &["a1"]);
        add_reference(&mut a, "Self", "A");
        let mut b = identifier_table("B", &["b1"]);
        add_reference(&mut b, "RefA", "A");
        let mut c = identifier_table("C", &["c1"]);
        add_reference(&mut c, "RefA", "A");
        add_reference(&mut c, "RefB", "B");
        let d = identifier_table("D", &["d1"]);

        catalog.load(a).unwrap();
        catalog.load(b).unwrap();
        catalog.load(c).unwrap();
        catalog.load(d).unwrap();

        let order = catalog.topological_order().unwrap();
        assert_eq!(order.len(), 4);

        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("A") < position("B"));
        assert!(position("A") < position("C"));
        assert!(position("B") < position("C"));
    }

    #[test]
    fn test_diamond_dependencies() {
        let catalog = Catalog::new();

        let shared = identifier_table("Shared", &["s1"]);
        let mut left = identifier_table("Left", &["l1"]);
        add_reference(&mut left, "Ref", "Shared");
        let mut right = identifier_table("Right", &["r1"]);
        add_reference(&mut right, "Ref", "Shared");
        let mut top = identifier_table("Top", &["t1"]);
        add_reference(&mut top, "RefL", "Left");
        add_reference(&mut top, "RefR", "Right");

        catalog.load(shared).unwrap();
        catalog.load(left).unwrap();
        catalog.load(right).unwrap();
        catalog.load(top).unwrap();

        let order = catalog.topological_order().unwrap();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("Shared") < position("Left"));
        assert!(position("Shared") < position("Right"));
        assert!(position("Left") < position("Top"));
        assert!(position("Right") < position("Top"));
    }

    #[test]
    fn test_cycle_is_an_error() {
        // Build the cycle directly against the sort, since loading a
        // mutually-referencing pair one at a time is itself rejected.
        let mut x = identifier_table("X", &["x1"]);
        add_reference(&mut x, "RefY", "Y");
        let mut y = identifier_table("Y", &["y1"]);
        add_reference(&mut y, "RefX", "X");

        let mut tables = HashMap::new();
        tables.insert("X".to_string(), x);
        tables.insert("Y".to_string(), y);

        let result = sort_tables(&tables);
        match result {
            Err(Error::CycleDetected(names)) => {
                assert!(names.contains('X'));
                assert!(names.contains('Y'));
            }
            other => panic!("Expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn test_unreferenced_tables_sort_by_name() {
        let catalog = Catalog::new();
        catalog.load(identifier_table("Zeta", &["z"])).unwrap();
        catalog.load(identifier_table("Alpha", &["a"])).unwrap();

        let order = catalog.topological_order().unwrap();
        assert_eq!(order, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new();
        assert!(catalog.topological_order().unwrap().is_empty());
    }
}
