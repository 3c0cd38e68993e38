//! Rows (entries): ordered attribute-name-to-value mappings.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::value::{Value, ValueContext, ValueKind};

/// One record within a table.
///
/// Slots keep insertion order. A row is created independently of any
/// table and validated against a table's attribute set when added; the
/// typed getters are lenient and fall back to zero-values, while the
/// `try_get_*` family reports whether the value was present and
/// convertible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    slots: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot, replacing any existing value under the same name.
    ///
    /// Fails on a blank name; slot order is preserved on replacement.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Structural(
                "row slot name must not be blank".to_string(),
            ));
        }

        let value = value.into();
        match self.slots.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.slots.push((name, value)),
        }
        Ok(())
    }

    /// Builder form of [`Row::set`] for test and fixture construction.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self, Error> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Get a slot value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove a slot, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.slots.iter().position(|(n, _)| n == name)?;
        Some(self.slots.remove(index).1)
    }

    /// Check if a slot exists.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|(n, _)| n == name)
    }

    /// Rename a slot in place, keeping its position and value.
    pub(crate) fn rename_slot(&mut self, old: &str, new: &str) {
        if let Some(slot) = self.slots.iter_mut().find(|(n, _)| n == old) {
            slot.0 = new.to_string();
        }
    }

    /// Slot names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(n, _)| n.as_str())
    }

    /// Slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the row has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn convert_slot(&self, name: &str, kind: &ValueKind) -> Option<Value> {
        let value = self.get(name)?;
        kind.convert(value, &ValueContext::bare()).ok()
    }

    /// Get as i64; present and convertible, or `None`.
    pub fn try_get_integer(&self, name: &str) -> Option<i64> {
        self.convert_slot(name, &ValueKind::Integer)?.as_integer()
    }

    /// Get as i64, or `0` when missing or not convertible.
    pub fn get_integer(&self, name: &str) -> i64 {
        self.try_get_integer(name).unwrap_or_default()
    }

    /// Get as f64; present and convertible, or `None`.
    pub fn try_get_float(&self, name: &str) -> Option<f64> {
        self.convert_slot(name, &ValueKind::Float)?.as_float()
    }

    /// Get as f64, or `0.0` when missing or not convertible.
    pub fn get_float(&self, name: &str) -> f64 {
        self.try_get_float(name).unwrap_or_default()
    }

    /// Get as bool; present and convertible, or `None`.
    pub fn try_get_bool(&self, name: &str) -> Option<bool> {
        self.convert_slot(name, &ValueKind::Bool)?.as_bool()
    }

    /// Get as bool, or `false` when missing or not convertible.
    pub fn get_bool(&self, name: &str) -> bool {
        self.try_get_bool(name).unwrap_or_default()
    }

    /// Get as text; present, or `None`.
    pub fn try_get_text(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }

    /// Get as text, or the empty string when missing.
    pub fn get_text(&self, name: &str) -> String {
        self.try_get_text(name).unwrap_or_default()
    }

    /// Get as guid; present and convertible, or `None`.
    pub fn try_get_guid(&self, name: &str) -> Option<Uuid> {
        self.convert_slot(name, &ValueKind::Guid)?.as_guid()
    }

    /// Get as guid, or the nil guid when missing or not convertible.
    pub fn get_guid(&self, name: &str) -> Uuid {
        self.try_get_guid(name).unwrap_or_else(Uuid::nil)
    }

    /// Get as date-time; present and convertible, or `None`.
    pub fn try_get_datetime(&self, name: &str) -> Option<NaiveDateTime> {
        self.convert_slot(name, &ValueKind::DateTime)?.as_datetime()
    }

    /// Get as date-time, or the epoch when missing or not convertible.
    pub fn get_datetime(&self, name: &str) -> NaiveDateTime {
        self.try_get_datetime(name).unwrap_or_default()
    }

    /// Parse a textual slot into any `FromStr` type; present and
    /// parseable, or `None`. This stands in for enum-typed access: the
    /// caller's enum implements `FromStr` over its variant names.
    pub fn try_get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        T::from_str(&self.try_get_text(name)?).ok()
    }

    /// Parse a textual slot into any `FromStr` type, or its default.
    pub fn get_parsed<T: FromStr + Default>(&self, name: &str) -> T {
        self.try_get_parsed(name).unwrap_or_default()
    }

    /// Best-effort list access: converts each element to the requested
    /// element kind and silently skips elements that do not convert. A
    /// lone scalar that converts is returned as a one-element list.
    ///
    /// This is deliberately more forgiving than list-kind validation,
    /// which fails the whole value on any bad element.
    pub fn get_list(&self, name: &str, element: &ValueKind) -> Vec<Value> {
        let ctx = ValueContext::bare();
        match self.get(name) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|item| element.convert(item, &ctx).ok())
                .collect(),
            Some(scalar) => element
                .convert(scalar, &ctx)
                .map(|v| vec![v])
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}
