//! The closed set of value kinds.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::color::Color;
use super::float::OrderedF64;
use super::value::Value;

/// A reference to another table's identifier attribute.
///
/// Equality and hashing consider only the target `(table, attribute)`
/// pair; two references to the same identifier are the same kind whether
/// or not they tolerate empty values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceKind {
    /// Name of the target table.
    pub table: String,
    /// Name of the target attribute (must be the table's identifier).
    pub attribute: String,
    /// Whether null/empty values are accepted.
    pub allow_empty: bool,
}

impl ReferenceKind {
    /// Create a reference kind targeting the given table and attribute.
    pub fn new(table: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            attribute: attribute.into(),
            allow_empty: false,
        }
    }

    /// Accept null/empty values.
    pub fn with_allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }
}

impl PartialEq for ReferenceKind {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.attribute == other.attribute
    }
}

impl Eq for ReferenceKind {}

impl Hash for ReferenceKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.attribute.hash(state);
    }
}

/// The closed set of value kinds.
///
/// Each kind owns validation, conversion, and default-value behavior for
/// the values it governs. The set is exhaustive by construction; new
/// kinds are a compile-time event, not a runtime registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Naive date-time.
    DateTime,
    /// Globally unique identifier.
    Guid,
    /// RGBA color in canonical hex form.
    Color,
    /// Path to a file, checked through the injected file store.
    FilePath,
    /// Path to a folder, checked through the injected file store.
    FolderPath,
    /// Homogeneous list of the element kind.
    List(Box<ValueKind>),
    /// Reference to another table's identifier.
    Reference(ReferenceKind),
}

impl ValueKind {
    /// Create a list kind over the given element kind.
    pub fn list(element: ValueKind) -> Self {
        ValueKind::List(Box::new(element))
    }

    /// Create a reference kind targeting a table's identifier attribute.
    ///
    /// Prefer [`crate::Catalog::create_reference`], which checks that the
    /// target is loaded and actually is the identifier.
    pub fn reference(table: impl Into<String>, attribute: impl Into<String>) -> Self {
        ValueKind::Reference(ReferenceKind::new(table, attribute))
    }

    /// The closed set of non-parameterized kinds, for UI pickers and
    /// code-generation tooling.
    pub fn all_basic() -> Vec<ValueKind> {
        vec![
            ValueKind::Text,
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::Bool,
            ValueKind::DateTime,
            ValueKind::Guid,
            ValueKind::Color,
            ValueKind::FilePath,
            ValueKind::FolderPath,
        ]
    }

    /// Display name of the kind.
    pub fn type_name(&self) -> String {
        match self {
            ValueKind::Text => "Text".to_string(),
            ValueKind::Integer => "Integer".to_string(),
            ValueKind::Float => "Float".to_string(),
            ValueKind::Bool => "Bool".to_string(),
            ValueKind::DateTime => "DateTime".to_string(),
            ValueKind::Guid => "Guid".to_string(),
            ValueKind::Color => "Color".to_string(),
            ValueKind::FilePath => "FilePath".to_string(),
            ValueKind::FolderPath => "FolderPath".to_string(),
            ValueKind::List(element) => format!("List<{}>", element.type_name()),
            ValueKind::Reference(r) => format!("Reference<{}.{}>", r.table, r.attribute),
        }
    }

    /// The kind's default value.
    ///
    /// Reference kinds default to [`Value::Null`] here; a populated
    /// default (the target table's first identifier) comes from
    /// [`crate::Catalog::reference_default`], which has the loaded tables
    /// at hand.
    pub fn default_value(&self) -> Value {
        match self {
            ValueKind::Text | ValueKind::FilePath | ValueKind::FolderPath => {
                Value::Text(String::new())
            }
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Float => Value::Float(OrderedF64::new(0.0)),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::DateTime => Value::DateTime(chrono::NaiveDateTime::default()),
            ValueKind::Guid => Value::Guid(Uuid::nil()),
            ValueKind::Color => Value::Color(Color::BLACK),
            ValueKind::List(_) => Value::List(Vec::new()),
            ValueKind::Reference(_) => Value::Null,
        }
    }

    /// Check if this is a list kind.
    pub fn is_list(&self) -> bool {
        matches!(self, ValueKind::List(_))
    }

    /// Check if this is a reference kind.
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueKind::Reference(_))
    }

    /// The reference this kind targets, if any.
    ///
    /// Looks through list kinds, so a `List<Reference<..>>` attribute
    /// participates in the dependency graph like a plain reference.
    pub fn reference_target(&self) -> Option<&ReferenceKind> {
        match self {
            ValueKind::Reference(r) => Some(r),
            ValueKind::List(element) => element.reference_target(),
            _ => None,
        }
    }

    /// Check if validating this kind needs the loaded-table view.
    pub(crate) fn needs_catalog(&self) -> bool {
        self.reference_target().is_some()
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(kind: &ValueKind) -> u64 {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ValueKind::Integer.type_name(), "Integer");
        assert_eq!(
            ValueKind::list(ValueKind::Float).type_name(),
            "List<Float>"
        );
        assert_eq!(
            ValueKind::reference("Items", "Id").type_name(),
            "Reference<Items.Id>"
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ValueKind::Text.default_value(), Value::Text(String::new()));
        assert_eq!(ValueKind::Integer.default_value(), Value::Integer(0));
        assert_eq!(ValueKind::Bool.default_value(), Value::Bool(false));
        assert_eq!(ValueKind::List(Box::new(ValueKind::Text)).default_value(), Value::List(Vec::new()));
        assert_eq!(ValueKind::Guid.default_value(), Value::Guid(Uuid::nil()));
        assert!(ValueKind::reference("T", "Id").default_value().is_null());
    }

    #[test]
    fn test_reference_equality_ignores_allow_empty() {
        let strict = ReferenceKind::new("Items", "Id");
        let lenient = ReferenceKind::new("Items", "Id").with_allow_empty();

        assert_eq!(strict, lenient);
        assert_eq!(
            hash_of(&ValueKind::Reference(strict)),
            hash_of(&ValueKind::Reference(lenient))
        );
    }

    #[test]
    fn test_list_equality_by_element_kind() {
        assert_eq!(
            ValueKind::list(ValueKind::Integer),
            ValueKind::list(ValueKind::Integer)
        );
        assert_ne!(
            ValueKind::list(ValueKind::Integer),
            ValueKind::list(ValueKind::Text)
        );
    }

    #[test]
    fn test_reference_target_through_list() {
        let kind = ValueKind::list(ValueKind::reference("Items", "Id"));
        let target = kind.reference_target().unwrap();
        assert_eq!(target.table, "Items");
        assert_eq!(target.attribute, "Id");
        assert!(ValueKind::list(ValueKind::Text).reference_target().is_none());
    }

    #[test]
    fn test_all_basic_is_closed() {
        let basics = ValueKind::all_basic();
        assert_eq!(basics.len(), 9);
        assert!(basics.iter().all(|k| !k.is_list() && !k.is_reference()));
    }
}
