//! Diff reporting between row and table snapshots.
//!
//! The reports are plain text blocks consumed verbatim by upstream
//! tooling (change previews, import summaries), so the wording here is
//! part of the contract.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::attr::AttributeDef;
use crate::row::Row;
use crate::table::Table;
use crate::value::{Value, ValueKind};

/// Diff between two rows.
///
/// Keys are visited in alphabetical order: removed and added sections for
/// keys unique to one side, then a modified line per shared key whose
/// values differ.
#[derive(Debug, Clone, Default)]
pub struct RowDiff {
    /// Slots present only in the first row.
    pub removed: Vec<(String, Value)>,
    /// Slots present only in the second row.
    pub added: Vec<(String, Value)>,
    /// Shared slots whose values differ: (name, before, after).
    pub modified: Vec<(String, Value, Value)>,
}

impl RowDiff {
    /// Compute the diff between two rows.
    pub fn compute(before: &Row, after: &Row) -> Self {
        let keys: BTreeSet<&str> = before.names().chain(after.names()).collect();

        let mut diff = RowDiff::default();
        for key in keys {
            match (before.get(key), after.get(key)) {
                (Some(old), None) => diff.removed.push((key.to_string(), old.clone())),
                (None, Some(new)) => diff.added.push((key.to_string(), new.clone())),
                (Some(old), Some(new)) if old != new => {
                    diff.modified
                        .push((key.to_string(), old.clone(), new.clone()))
                }
                _ => {}
            }
        }
        diff
    }

    /// Check if the rows differ at all.
    pub fn has_diff(&self) -> bool {
        !self.is_empty()
    }

    /// Check if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.modified.is_empty()
    }

    /// The human-readable change summary.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        for (name, value) in &self.removed {
            lines.push(format!("Removed attribute: {} (was '{}')", name, value));
        }
        for (name, value) in &self.added {
            lines.push(format!("Added attribute: {} (now '{}')", name, value));
        }
        for (name, old, new) in &self.modified {
            lines.push(format!(
                "Modified attribute: {} ('{}' -> '{}')",
                name, old, new
            ));
        }
        lines.join("\n")
    }
}

impl fmt::Display for RowDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

/// Change to a single attribute between two table snapshots.
#[derive(Debug, Clone)]
pub enum AttributeChange {
    /// Attribute was added.
    Added(AttributeDef),
    /// Attribute was removed.
    Removed(AttributeDef),
    /// Attribute kind was changed.
    KindChanged {
        /// Name of the attribute.
        name: String,
        /// Original kind.
        from: ValueKind,
        /// New kind.
        to: ValueKind,
    },
    /// Identifier flag was changed.
    IdentifierChanged {
        /// Name of the attribute.
        name: String,
        /// Was the identifier before.
        from: bool,
        /// Is the identifier now.
        to: bool,
    },
    /// Default value was changed.
    DefaultChanged {
        /// Name of the attribute.
        name: String,
        /// Original default.
        from: Option<Value>,
        /// New default.
        to: Option<Value>,
    },
}

impl AttributeChange {
    /// The attribute name this change concerns.
    pub fn attribute_name(&self) -> &str {
        match self {
            AttributeChange::Added(a) => &a.name,
            AttributeChange::Removed(a) => &a.name,
            AttributeChange::KindChanged { name, .. } => name,
            AttributeChange::IdentifierChanged { name, .. } => name,
            AttributeChange::DefaultChanged { name, .. } => name,
        }
    }
}

/// Change to a single row between two table snapshots.
///
/// The key is the identifier value when both snapshots share an
/// identifier attribute, otherwise the row index.
#[derive(Debug, Clone)]
pub enum RowChange {
    /// Row was added.
    Added {
        /// Identifier value or index of the row.
        key: String,
        /// The added row.
        row: Row,
    },
    /// Row was removed.
    Removed {
        /// Identifier value or index of the row.
        key: String,
        /// The removed row.
        row: Row,
    },
    /// Row was modified.
    Modified {
        /// Identifier value or index of the row.
        key: String,
        /// Per-slot changes.
        diff: RowDiff,
    },
}

impl RowChange {
    /// The row key this change concerns.
    pub fn key(&self) -> &str {
        match self {
            RowChange::Added { key, .. } => key,
            RowChange::Removed { key, .. } => key,
            RowChange::Modified { key, .. } => key,
        }
    }
}

/// Complete diff between two table snapshots.
#[derive(Debug, Clone, Default)]
pub struct TableDiff {
    /// Table rename, if the snapshots are named differently.
    pub renamed: Option<(String, String)>,
    /// Changes to the attribute list.
    pub attribute_changes: Vec<AttributeChange>,
    /// Changes to the row list.
    pub row_changes: Vec<RowChange>,
}

impl TableDiff {
    /// Compute the diff between two table snapshots.
    ///
    /// Rows are matched by identifier value when both snapshots share an
    /// identifier attribute, otherwise by position.
    pub fn compute(before: &Table, after: &Table) -> Self {
        let renamed = if before.name() != after.name() {
            Some((before.name().to_string(), after.name().to_string()))
        } else {
            None
        };

        TableDiff {
            renamed,
            attribute_changes: Self::diff_attributes(before, after),
            row_changes: Self::diff_rows(before, after),
        }
    }

    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.renamed.is_none()
            && self.attribute_changes.is_empty()
            && self.row_changes.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        usize::from(self.renamed.is_some())
            + self.attribute_changes.len()
            + self.row_changes.len()
    }

    /// The human-readable change summary.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        if let Some((from, to)) = &self.renamed {
            lines.push(format!("Renamed table: '{}' -> '{}'", from, to));
        }
        for change in &self.attribute_changes {
            match change {
                AttributeChange::Added(a) => {
                    lines.push(format!("Added attribute: {}", a.name))
                }
                AttributeChange::Removed(a) => {
                    lines.push(format!("Removed attribute: {}", a.name))
                }
                AttributeChange::KindChanged { name, from, to } => lines.push(format!(
                    "Modified attribute: {} (kind '{}' -> '{}')",
                    name,
                    from.type_name(),
                    to.type_name()
                )),
                AttributeChange::IdentifierChanged { name, from, to } => lines.push(format!(
                    "Modified attribute: {} (identifier {} -> {})",
                    name, from, to
                )),
                AttributeChange::DefaultChanged { name, from, to } => lines.push(format!(
                    "Modified attribute: {} (default '{}' -> '{}')",
                    name,
                    from.clone().unwrap_or(Value::Null),
                    to.clone().unwrap_or(Value::Null)
                )),
            }
        }
        for change in &self.row_changes {
            match change {
                RowChange::Added { key, .. } => lines.push(format!("Added row: {}", key)),
                RowChange::Removed { key, .. } => lines.push(format!("Removed row: {}", key)),
                RowChange::Modified { key, diff } => {
                    lines.push(format!("Modified row: {}", key));
                    for line in diff.report().lines() {
                        lines.push(format!("  {}", line));
                    }
                }
            }
        }
        lines.join("\n")
    }

    fn diff_attributes(before: &Table, after: &Table) -> Vec<AttributeChange> {
        let names: BTreeSet<&str> = before
            .attributes()
            .iter()
            .chain(after.attributes())
            .map(|a| a.name.as_str())
            .collect();

        let mut changes = Vec::new();
        for name in names {
            match (before.get_attribute(name), after.get_attribute(name)) {
                (Some(old), None) => changes.push(AttributeChange::Removed(old.clone())),
                (None, Some(new)) => changes.push(AttributeChange::Added(new.clone())),
                (Some(old), Some(new)) => {
                    if old.kind != new.kind {
                        changes.push(AttributeChange::KindChanged {
                            name: name.to_string(),
                            from: old.kind.clone(),
                            to: new.kind.clone(),
                        });
                    }
                    if old.is_identifier != new.is_identifier {
                        changes.push(AttributeChange::IdentifierChanged {
                            name: name.to_string(),
                            from: old.is_identifier,
                            to: new.is_identifier,
                        });
                    }
                    if old.default != new.default {
                        changes.push(AttributeChange::DefaultChanged {
                            name: name.to_string(),
                            from: old.default.clone(),
                            to: new.default.clone(),
                        });
                    }
                }
                (None, None) => {}
            }
        }
        changes
    }

    fn diff_rows(before: &Table, after: &Table) -> Vec<RowChange> {
        let shared_identifier = match (before.identifier_attribute(), after.identifier_attribute())
        {
            (Some(a), Some(b)) if a.name == b.name => Some(a.name.clone()),
            _ => None,
        };

        match shared_identifier {
            Some(identifier) => Self::diff_rows_by_identifier(before, after, &identifier),
            None => Self::diff_rows_by_position(before, after),
        }
    }

    fn diff_rows_by_identifier(
        before: &Table,
        after: &Table,
        identifier: &str,
    ) -> Vec<RowChange> {
        // Keyed by display string for ordering, but matched by raw value
        // so non-text identifiers resolve correctly.
        let mut keys: BTreeMap<String, Value> = BTreeMap::new();
        for value in before
            .get_raw_identifier_values()
            .into_iter()
            .chain(after.get_raw_identifier_values())
        {
            keys.insert(value.to_string(), value);
        }

        let mut changes = Vec::new();
        for (key, value) in keys {
            let old = before
                .find_entry(identifier, &value)
                .and_then(|i| before.entry(i));
            let new = after
                .find_entry(identifier, &value)
                .and_then(|i| after.entry(i));

            match (old, new) {
                (Some(row), None) => changes.push(RowChange::Removed {
                    key,
                    row: row.clone(),
                }),
                (None, Some(row)) => changes.push(RowChange::Added {
                    key,
                    row: row.clone(),
                }),
                (Some(old), Some(new)) => {
                    let diff = RowDiff::compute(old, new);
                    if diff.has_diff() {
                        changes.push(RowChange::Modified { key, diff });
                    }
                }
                (None, None) => {}
            }
        }
        changes
    }

    fn diff_rows_by_position(before: &Table, after: &Table) -> Vec<RowChange> {
        let mut changes = Vec::new();
        let shared = before.entry_count().min(after.entry_count());

        for index in 0..shared {
            let diff = RowDiff::compute(
                &before.entries()[index],
                &after.entries()[index],
            );
            if diff.has_diff() {
                changes.push(RowChange::Modified {
                    key: index.to_string(),
                    diff,
                });
            }
        }
        for index in shared..before.entry_count() {
            changes.push(RowChange::Removed {
                key: index.to_string(),
                row: before.entries()[index].clone(),
            });
        }
        for index in shared..after.entry_count() {
            changes.push(RowChange::Added {
                key: index.to_string(),
                row: after.entries()[index].clone(),
            });
        }
        changes
    }
}

impl fmt::Display for TableDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn test_row_diff_modified() {
        let a = Row::new().with("Field1", 10i64).unwrap();
        let b = Row::new().with("Field1", 20i64).unwrap();

        let diff = RowDiff::compute(&a, &b);
        assert!(diff.has_diff());

        let report = diff.report();
        assert!(report.contains("Modified attribute: Field1"));
        assert!(report.contains("10"));
        assert!(report.contains("20"));
    }

    #[test]
    fn test_row_diff_added_and_removed() {
        let a = Row::new()
            .with("Gone", 1i64)
            .unwrap()
            .with("Kept", 2i64)
            .unwrap();
        let b = Row::new()
            .with("Kept", 2i64)
            .unwrap()
            .with("New", 3i64)
            .unwrap();

        let diff = RowDiff::compute(&a, &b);
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.added.len(), 1);
        assert!(diff.modified.is_empty());

        let report = diff.report();
        assert!(report.contains("Removed attribute: Gone"));
        assert!(report.contains("Added attribute: New"));
    }

    #[test]
    fn test_row_diff_alphabetical_order() {
        let a = Row::new()
            .with("Zeta", 1i64)
            .unwrap()
            .with("Alpha", 1i64)
            .unwrap();
        let b = Row::new()
            .with("Zeta", 2i64)
            .unwrap()
            .with("Alpha", 2i64)
            .unwrap();

        let diff = RowDiff::compute(&a, &b);
        let names: Vec<&str> = diff.modified.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_row_diff_equal_rows() {
        let a = Row::new().with("Field1", 10i64).unwrap();
        let diff = RowDiff::compute(&a, &a.clone());

        assert!(!diff.has_diff());
        assert!(diff.is_empty());
        assert!(diff.report().is_empty());
    }

    fn sample_table() -> Table {
        let mut table = Table::new("Items");
        table
            .add_attribute(AttributeDef::new("Id", ValueKind::Text).identifier())
            .unwrap();
        table
            .add_attribute(AttributeDef::new("Cost", ValueKind::Integer))
            .unwrap();
        for (id, cost) in [("SWORD", 100i64), ("SHIELD", 80)] {
            table
                .add_entry(
                    Row::new()
                        .with("Id", id)
                        .unwrap()
                        .with("Cost", cost)
                        .unwrap(),
                )
                .unwrap();
        }
        table
    }

    #[test]
    fn test_table_diff_no_changes() {
        let table = sample_table();
        let diff = TableDiff::compute(&table, &table.clone());

        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_table_diff_attribute_changes() {
        let before = sample_table();

        let mut after = sample_table();
        after
            .add_attribute(AttributeDef::new("Rare", ValueKind::Bool))
            .unwrap();
        after
            .convert_attribute_type("Cost", ValueKind::Float)
            .unwrap();

        let diff = TableDiff::compute(&before, &after);
        assert_eq!(diff.attribute_changes.len(), 2);

        let added = diff
            .attribute_changes
            .iter()
            .find(|c| matches!(c, AttributeChange::Added(_)))
            .unwrap();
        assert_eq!(added.attribute_name(), "Rare");

        assert!(diff
            .attribute_changes
            .iter()
            .any(|c| matches!(c, AttributeChange::KindChanged { name, .. } if name == "Cost")));
    }

    #[test]
    fn test_table_diff_rows_matched_by_identifier() {
        let before = sample_table();

        let mut after = sample_table();
        after.set_value(0, "Cost", 120i64).unwrap();
        after.delete_entry(1).unwrap();
        after
            .add_entry(
                Row::new()
                    .with("Id", "BOW")
                    .unwrap()
                    .with("Cost", 60i64)
                    .unwrap(),
            )
            .unwrap();

        let diff = TableDiff::compute(&before, &after);

        let keys: Vec<&str> = diff.row_changes.iter().map(RowChange::key).collect();
        assert_eq!(keys, vec!["BOW", "SHIELD", "SWORD"]);
        assert!(matches!(diff.row_changes[0], RowChange::Added { .. }));
        assert!(matches!(diff.row_changes[1], RowChange::Removed { .. }));
        assert!(matches!(diff.row_changes[2], RowChange::Modified { .. }));

        let report = diff.report();
        assert!(report.contains("Added row: BOW"));
        assert!(report.contains("Removed row: SHIELD"));
        assert!(report.contains("Modified row: SWORD"));
        assert!(report.contains("Modified attribute: Cost"));
    }

    #[test]
    fn test_table_diff_rename() {
        let before = sample_table();
        let mut after = sample_table();
        after = {
            let mut renamed = Table::new("Gear");
            for attr in after.attributes() {
                renamed.add_attribute(attr.clone()).unwrap();
            }
            for row in after.entries() {
                renamed.add_entry(row.clone()).unwrap();
            }
            renamed
        };

        let diff = TableDiff::compute(&before, &after);
        assert_eq!(
            diff.renamed,
            Some(("Items".to_string(), "Gear".to_string()))
        );
        assert!(diff.report().contains("Renamed table"));
    }
}
