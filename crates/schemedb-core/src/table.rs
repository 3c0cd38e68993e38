//! Tables (schemes): ordered attributes plus ordered rows, with
//! invariants enforced at every mutation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attr::AttributeDef;
use crate::error::Error;
use crate::row::Row;
use crate::value::{Value, ValueContext, ValueKind};

/// Prefix an error with row/table context, preserving its variant so
/// callers can still classify the failure.
fn row_context(table: &str, row: usize, error: Error) -> Error {
    let detail = format!("row {} of table '{}'", row, table);
    match error {
        Error::ReferentialIntegrity(msg) => {
            Error::ReferentialIntegrity(format!("{}: {}", detail, msg))
        }
        Error::Validation { kind, message } => Error::Validation {
            kind,
            message: format!("{}: {}", detail, message),
        },
        Error::Conversion { kind, message } => Error::Conversion {
            kind,
            message: format!("{}: {}", detail, message),
        },
        other => other,
    }
}

/// Row ordering for [`Table::get_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    /// Table order.
    Unsorted,
    /// Ascending by the named attribute's value.
    Ascending(String),
    /// Descending by the named attribute's value; the exact reverse of
    /// the ascending order.
    Descending(String),
}

/// A named table of typed attributes and rows.
///
/// Invariants held at every mutation:
/// 1. attribute names are unique (case-sensitive) and non-blank;
/// 2. at most one attribute is the identifier;
/// 3. identifier values are unique across rows;
/// 4. rows only hold slots for known attributes;
/// 5. stored values satisfy their attribute's kind (reference kinds are
///    checked against the catalog at load/validate time).
///
/// Equality and hashing cover name, attributes (publish flag excluded),
/// and rows, in order; equal tables hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Table {
    name: String,
    attributes: Vec<AttributeDef>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// The table name, used as the catalog key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in rank order.
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Rows in table order.
    pub fn entries(&self) -> &[Row] {
        &self.rows
    }

    /// Get a row by index.
    pub fn entry(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows.
    pub fn entry_count(&self) -> usize {
        self.rows.len()
    }

    /// Get an attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The identifier attribute, if one is defined.
    pub fn identifier_attribute(&self) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.is_identifier)
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Add an attribute, backfilling every existing row with its default.
    ///
    /// Fails on a blank or duplicate name, on a second identifier, and on
    /// an identifier added to a table whose rows would share the
    /// backfilled default.
    pub fn add_attribute(&mut self, attribute: AttributeDef) -> Result<(), Error> {
        if attribute.name.trim().is_empty() {
            return Err(Error::Structural(
                "attribute name must not be blank".to_string(),
            ));
        }
        if self.get_attribute(&attribute.name).is_some() {
            return Err(Error::Structural(format!(
                "table '{}' already has an attribute '{}'",
                self.name, attribute.name
            )));
        }
        if attribute.is_identifier {
            if let Some(existing) = self.identifier_attribute() {
                return Err(Error::Structural(format!(
                    "table '{}' already has identifier attribute '{}'",
                    self.name, existing.name
                )));
            }
            if self.rows.len() > 1 {
                return Err(Error::Structural(format!(
                    "cannot add identifier '{}': {} rows would share the default value",
                    attribute.name,
                    self.rows.len()
                )));
            }
        }

        let default = attribute.default_value();
        for row in &mut self.rows {
            if !row.contains(&attribute.name) {
                row.set(&attribute.name, default.clone())?;
            }
        }
        self.attributes.push(attribute);
        Ok(())
    }

    /// Remove an attribute and prune its slots from every row.
    pub fn remove_attribute(&mut self, name: &str) -> Result<AttributeDef, Error> {
        let index = self.attribute_index(name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, name))
        })?;

        for row in &mut self.rows {
            row.remove(name);
        }
        Ok(self.attributes.remove(index))
    }

    /// Rename an attribute, carrying the new name into every row slot.
    pub fn rename_attribute(&mut self, old: &str, new: &str) -> Result<(), Error> {
        if new.trim().is_empty() {
            return Err(Error::Structural(
                "attribute name must not be blank".to_string(),
            ));
        }
        if old != new && self.get_attribute(new).is_some() {
            return Err(Error::Structural(format!(
                "table '{}' already has an attribute '{}'",
                self.name, new
            )));
        }
        let index = self.attribute_index(old).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, old))
        })?;

        self.attributes[index].name = new.to_string();
        for row in &mut self.rows {
            row.rename_slot(old, new);
        }
        Ok(())
    }

    /// The effective identifier value of a row: the stored slot, or the
    /// identifier's default for rows that never set one.
    fn effective_identifier(&self, row: &Row) -> Option<Value> {
        let identifier = self.identifier_attribute()?;
        Some(
            row.get(&identifier.name)
                .cloned()
                .unwrap_or_else(|| identifier.default_value()),
        )
    }

    fn check_identifier_unique(&self, candidate: &Row, skip: Option<usize>) -> Result<(), Error> {
        let Some(value) = self.effective_identifier(candidate) else {
            return Ok(());
        };

        for (index, row) in self.rows.iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            if self.effective_identifier(row).as_ref() == Some(&value) {
                return Err(Error::ReferentialIntegrity(format!(
                    "duplicate identifier value '{}' in table '{}'",
                    value, self.name
                )));
            }
        }
        Ok(())
    }

    /// Add a row under the strict policy: unknown slots are rejected and
    /// every present value must already satisfy its attribute's kind.
    /// Reference kinds are deferred to catalog-level validation.
    pub fn add_entry(&mut self, row: Row) -> Result<(), Error> {
        let ctx = ValueContext::bare();
        for (name, value) in row.iter() {
            let attribute = self.get_attribute(name).ok_or_else(|| {
                Error::Structural(format!(
                    "row has unknown attribute '{}' for table '{}'",
                    name, self.name
                ))
            })?;
            if !attribute.kind.needs_catalog() {
                attribute.kind.is_valid(value, &ctx)?;
            }
        }
        self.check_identifier_unique(&row, None)?;
        self.rows.push(row);
        Ok(())
    }

    /// Add a row under the lenient policy: unknown slots are pruned and
    /// values are coerced to their attribute's kind where possible.
    pub fn add_entry_lenient(&mut self, mut row: Row) -> Result<(), Error> {
        let unknown: Vec<String> = row
            .names()
            .filter(|n| self.get_attribute(n).is_none())
            .map(String::from)
            .collect();
        for name in unknown {
            row.remove(&name);
        }

        let ctx = ValueContext::bare();
        for attribute in &self.attributes {
            if attribute.kind.needs_catalog() {
                continue;
            }
            if let Some(value) = row.get(&attribute.name) {
                let converted = attribute.kind.convert(value, &ctx)?;
                row.set(&attribute.name, converted)?;
            }
        }

        self.check_identifier_unique(&row, None)?;
        self.rows.push(row);
        Ok(())
    }

    /// Delete a row by index.
    pub fn delete_entry(&mut self, index: usize) -> Result<Row, Error> {
        if index >= self.rows.len() {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name, index
            )));
        }
        Ok(self.rows.remove(index))
    }

    /// Find the first row whose slot under `attribute` equals `value`.
    pub fn find_entry(&self, attribute: &str, value: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(attribute) == Some(value))
    }

    /// Write a single slot, coercing the value to the attribute's kind
    /// and guarding identifier uniqueness.
    pub fn set_value(
        &mut self,
        index: usize,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        if index >= self.rows.len() {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name, index
            )));
        }
        let attr = self.get_attribute(attribute).ok_or_else(|| {
            Error::NotFound(format!(
                "table '{}' has no attribute '{}'",
                self.name, attribute
            ))
        })?;

        let value = value.into();
        let stored = if attr.kind.needs_catalog() {
            value
        } else {
            attr.kind.convert(&value, &ValueContext::bare())?
        };

        if attr.is_identifier {
            let mut candidate = self.rows[index].clone();
            candidate.set(attribute, stored.clone())?;
            self.check_identifier_unique(&candidate, Some(index))?;
        }

        self.rows[index].set(attribute, stored)
    }

    /// Write a slot without validation. Callers have already guarded the
    /// invariants (the rename cascade does its own collision check).
    pub(crate) fn write_slot(&mut self, index: usize, attribute: &str, value: Value) {
        if let Some(row) = self.rows.get_mut(index) {
            // set only fails on a blank name, which existing slots never have
            let _ = row.set(attribute, value);
        }
    }

    /// Atomically convert an attribute to a new kind.
    ///
    /// Every row's value must convert; rows without a value (or with
    /// null) receive the new kind's default. On any failure the table is
    /// left completely unchanged. Converting the identifier re-checks
    /// uniqueness over the converted values.
    pub fn convert_attribute_type(&mut self, name: &str, new_kind: ValueKind) -> Result<(), Error> {
        self.convert_attribute_type_with(name, new_kind, &ValueContext::bare())
    }

    /// [`Table::convert_attribute_type`] with explicit collaborators, so
    /// reference and path kinds can resolve.
    pub fn convert_attribute_type_with(
        &mut self,
        name: &str,
        new_kind: ValueKind,
        ctx: &ValueContext<'_>,
    ) -> Result<(), Error> {
        let index = self.attribute_index(name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, name))
        })?;

        // Phase one: convert everything without touching the table.
        let mut converted = Vec::with_capacity(self.rows.len());
        for (row_index, row) in self.rows.iter().enumerate() {
            let value = match row.get(name) {
                Some(value) if !value.is_null() => new_kind
                    .convert(value, ctx)
                    .map_err(|e| row_context(&self.name, row_index, e))?,
                _ => new_kind.default_value(),
            };
            converted.push(value);
        }

        if self.attributes[index].is_identifier {
            let mut seen = HashSet::new();
            for value in &converted {
                if !seen.insert(value) {
                    return Err(Error::ReferentialIntegrity(format!(
                        "converting '{}' to {} collapses identifier value '{}'",
                        name,
                        new_kind.type_name(),
                        value
                    )));
                }
            }
        }

        let new_default = self.attributes[index]
            .default
            .as_ref()
            .and_then(|d| new_kind.convert(d, ctx).ok());

        // Phase two: commit.
        for (row, value) in self.rows.iter_mut().zip(converted) {
            row.set(name, value)?;
        }
        debug!(
            table = %self.name,
            attribute = %name,
            kind = %new_kind.type_name(),
            rows = self.rows.len(),
            "converted attribute type"
        );
        self.attributes[index].kind = new_kind;
        self.attributes[index].default = new_default;
        Ok(())
    }

    /// Move an attribute one rank earlier.
    pub fn increase_attribute_rank(&mut self, name: &str) -> Result<(), Error> {
        let index = self.attribute_index(name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, name))
        })?;
        if index == 0 {
            return Err(Error::Structural(format!(
                "attribute '{}' is already first",
                name
            )));
        }
        self.attributes.swap(index - 1, index);
        Ok(())
    }

    /// Move an attribute one rank later.
    pub fn decrease_attribute_rank(&mut self, name: &str) -> Result<(), Error> {
        let index = self.attribute_index(name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, name))
        })?;
        if index + 1 == self.attributes.len() {
            return Err(Error::Structural(format!(
                "attribute '{}' is already last",
                name
            )));
        }
        self.attributes.swap(index, index + 1);
        Ok(())
    }

    /// Move an attribute to an absolute rank.
    pub fn move_attribute_rank(&mut self, name: &str, rank: usize) -> Result<(), Error> {
        let index = self.attribute_index(name).ok_or_else(|| {
            Error::NotFound(format!("table '{}' has no attribute '{}'", self.name, name))
        })?;
        if rank >= self.attributes.len() {
            return Err(Error::Structural(format!(
                "rank {} is out of range for {} attributes",
                rank,
                self.attributes.len()
            )));
        }
        let attribute = self.attributes.remove(index);
        self.attributes.insert(rank, attribute);
        Ok(())
    }

    /// Move a row one position up; moving the first row up fails.
    pub fn move_up_entry(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.rows.len() {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name, index
            )));
        }
        if index == 0 {
            return Err(Error::Structural("row is already first".to_string()));
        }
        self.rows.swap(index - 1, index);
        Ok(())
    }

    /// Move a row one position down; moving the last row down fails.
    pub fn move_down_entry(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.rows.len() {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name, index
            )));
        }
        if index + 1 == self.rows.len() {
            return Err(Error::Structural("row is already last".to_string()));
        }
        self.rows.swap(index, index + 1);
        Ok(())
    }

    /// Move a row to an absolute position.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), Error> {
        if from >= self.rows.len() {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name, from
            )));
        }
        if to >= self.rows.len() {
            return Err(Error::Structural(format!(
                "position {} is out of range for {} rows",
                to,
                self.rows.len()
            )));
        }
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        Ok(())
    }

    /// Swap two rows.
    pub fn swap_entries(&mut self, a: usize, b: usize) -> Result<(), Error> {
        let len = self.rows.len();
        if a >= len || b >= len {
            return Err(Error::NotFound(format!(
                "table '{}' has no row {}",
                self.name,
                a.max(b)
            )));
        }
        self.rows.swap(a, b);
        Ok(())
    }

    /// Rows in the requested order.
    ///
    /// Sorting by an attribute the table does not have is an error.
    /// Missing slots sort before every concrete value. The descending
    /// order is the exact reverse of the ascending order.
    pub fn get_entries(&self, order: &SortOrder) -> Result<Vec<Row>, Error> {
        let attribute = match order {
            SortOrder::Unsorted => return Ok(self.rows.clone()),
            SortOrder::Ascending(name) | SortOrder::Descending(name) => name,
        };
        if self.get_attribute(attribute).is_none() {
            return Err(Error::Structural(format!(
                "cannot sort table '{}' by unknown attribute '{}'",
                self.name, attribute
            )));
        }

        let mut sorted = self.rows.clone();
        sorted.sort_by(|a, b| {
            let left = a.get(attribute).unwrap_or(&Value::Null);
            let right = b.get(attribute).unwrap_or(&Value::Null);
            left.cmp(right)
        });
        if matches!(order, SortOrder::Descending(_)) {
            sorted.reverse();
        }
        Ok(sorted)
    }

    /// Identifier values across all rows, stringified.
    pub fn get_identifier_values(&self) -> Vec<String> {
        self.get_raw_identifier_values()
            .iter()
            .map(Value::to_string)
            .collect()
    }

    /// Identifier values across all rows, as stored values. Rows that
    /// never set the identifier contribute its default.
    pub fn get_raw_identifier_values(&self) -> Vec<Value> {
        self.rows
            .iter()
            .filter_map(|row| self.effective_identifier(row))
            .collect()
    }

    /// Fully validate the table: structural invariants, identifier
    /// uniqueness, and per-slot strict kind checks (reference and path
    /// kinds resolve through the context's collaborators).
    pub fn validate_with(&self, ctx: &ValueContext<'_>) -> Result<(), Error> {
        let mut names = HashSet::new();
        let mut identifiers = 0usize;
        for attribute in &self.attributes {
            if attribute.name.trim().is_empty() {
                return Err(Error::Structural(format!(
                    "table '{}' has a blank attribute name",
                    self.name
                )));
            }
            if !names.insert(attribute.name.as_str()) {
                return Err(Error::Structural(format!(
                    "table '{}' has duplicate attribute '{}'",
                    self.name, attribute.name
                )));
            }
            if attribute.is_identifier {
                identifiers += 1;
            }
        }
        if identifiers > 1 {
            return Err(Error::Structural(format!(
                "table '{}' has {} identifier attributes",
                self.name, identifiers
            )));
        }

        let mut seen = HashSet::new();
        for value in self.get_raw_identifier_values() {
            if !seen.insert(value.clone()) {
                return Err(Error::ReferentialIntegrity(format!(
                    "duplicate identifier value '{}' in table '{}'",
                    value, self.name
                )));
            }
        }

        for (index, row) in self.rows.iter().enumerate() {
            for (name, value) in row.iter() {
                let attribute = self.get_attribute(name).ok_or_else(|| {
                    Error::Structural(format!(
                        "row {} of table '{}' has unknown attribute '{}'",
                        index, self.name, name
                    ))
                })?;
                attribute
                    .kind
                    .is_valid(value, ctx)
                    .map_err(|e| row_context(&self.name, index, e))?;
            }
        }
        Ok(())
    }

    /// Coerce every stored value to its attribute's kind and fill missing
    /// slots with defaults; all-or-nothing per table. Runs when a table
    /// is loaded into the catalog.
    pub(crate) fn convert_all_with(&mut self, ctx: &ValueContext<'_>) -> Result<(), Error> {
        // Phase one: convert every slot of every row up front.
        let mut replacements = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let mut replacement = Row::new();
            for attribute in &self.attributes {
                let value = match row.get(&attribute.name) {
                    Some(value) if !value.is_null() => attribute
                        .kind
                        .convert(value, ctx)
                        .map_err(|e| row_context(&self.name, index, e))?,
                    _ => attribute.default_value(),
                };
                replacement.set(&attribute.name, value)?;
            }
            replacements.push(replacement);
        }

        if let Some(identifier) = self.identifier_attribute() {
            let mut seen = HashSet::new();
            for row in &replacements {
                if let Some(value) = row.get(&identifier.name) {
                    if !seen.insert(value.clone()) {
                        return Err(Error::ReferentialIntegrity(format!(
                            "duplicate identifier value '{}' in table '{}'",
                            value, self.name
                        )));
                    }
                }
            }
        }

        // Phase two: commit.
        self.rows = replacements;
        Ok(())
    }
}
