//! Attribute definitions for tables.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueKind};

/// A column descriptor within a table.
///
/// Equality and hashing consider name, kind, identifier flag, and default
/// value; the publish flag is presentation metadata and deliberately
/// excluded, so tables that differ only in publish configuration compare
/// equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name (unique within the owning table, non-blank).
    pub name: String,
    /// The value kind every row slot under this attribute must satisfy.
    pub kind: ValueKind,
    /// Whether this attribute is the table's unique key.
    pub is_identifier: bool,
    /// Explicit default for new rows; the kind default applies otherwise.
    pub default: Option<Value>,
    /// Whether this attribute is exported by publish tooling.
    pub publish: bool,
}

impl AttributeDef {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_identifier: false,
            default: None,
            publish: true,
        }
    }

    /// Mark this attribute as the table's identifier.
    pub fn identifier(mut self) -> Self {
        self.is_identifier = true;
        self
    }

    /// Set the explicit default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the publish flag.
    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    /// The value a new row slot gets: the explicit default if set,
    /// otherwise the kind default.
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.default_value())
    }
}

impl PartialEq for AttributeDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.is_identifier == other.is_identifier
            && self.default == other.default
    }
}

impl Eq for AttributeDef {}

impl Hash for AttributeDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
        self.is_identifier.hash(state);
        self.default.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(attr: &AttributeDef) -> u64 {
        let mut hasher = DefaultHasher::new();
        attr.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_attribute_builder() {
        let attr = AttributeDef::new("Name", ValueKind::Text)
            .identifier()
            .with_default("UNNAMED");

        assert_eq!(attr.name, "Name");
        assert!(attr.is_identifier);
        assert!(attr.publish);
        assert_eq!(attr.default_value(), Value::from("UNNAMED"));
    }

    #[test]
    fn test_default_falls_back_to_kind() {
        let attr = AttributeDef::new("Count", ValueKind::Integer);
        assert_eq!(attr.default_value(), Value::Integer(0));
    }

    #[test]
    fn test_publish_excluded_from_equality_and_hash() {
        let published = AttributeDef::new("Name", ValueKind::Text).identifier();
        let hidden = AttributeDef::new("Name", ValueKind::Text)
            .identifier()
            .with_publish(false);

        assert_eq!(published, hidden);
        assert_eq!(hash_of(&published), hash_of(&hidden));
    }

    #[test]
    fn test_inequality_on_kind_and_flag() {
        let text = AttributeDef::new("Field", ValueKind::Text);
        let int = AttributeDef::new("Field", ValueKind::Integer);
        assert_ne!(text, int);

        let ident = AttributeDef::new("Field", ValueKind::Text).identifier();
        assert_ne!(text, ident);
    }

    #[test]
    fn test_clone_is_value_equal() {
        let attr = AttributeDef::new("Score", ValueKind::Float).with_default(1.5);
        let copy = attr.clone();

        assert_eq!(attr, copy);
        assert_eq!(hash_of(&attr), hash_of(&copy));
    }
}
