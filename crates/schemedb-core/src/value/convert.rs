//! Strict validation and lenient conversion for every value kind.
//!
//! `is_valid` demands the native representation (a boolean kind rejects
//! the string "true"); `convert` attempts coercion and is the path user
//! input takes. Both report failures as typed errors, never panics.

use std::path::Path;

use super::color::Color;
use super::context::ValueContext;
use super::datetime::parse_datetime;
use super::float::OrderedF64;
use super::kind::{ReferenceKind, ValueKind};
use super::value::Value;
use crate::error::Error;

impl ValueKind {
    /// Strictly check that `value` already has this kind's native
    /// representation.
    pub fn is_valid(&self, value: &Value, ctx: &ValueContext<'_>) -> Result<(), Error> {
        if value.is_null() {
            return match self {
                ValueKind::Reference(r) if r.allow_empty => Ok(()),
                _ => Err(Error::validation(
                    self.type_name(),
                    "null is not a valid value",
                )),
            };
        }

        match self {
            ValueKind::Text => expect_kind(self, value, matches!(value, Value::Text(_))),
            ValueKind::Integer => expect_kind(self, value, matches!(value, Value::Integer(_))),
            ValueKind::Float => expect_kind(self, value, matches!(value, Value::Float(_))),
            ValueKind::Bool => expect_kind(self, value, matches!(value, Value::Bool(_))),
            ValueKind::DateTime => expect_kind(self, value, matches!(value, Value::DateTime(_))),
            ValueKind::Guid => expect_kind(self, value, matches!(value, Value::Guid(_))),
            ValueKind::Color => expect_kind(self, value, matches!(value, Value::Color(_))),
            ValueKind::FilePath => check_path(self, value, ctx, PathShape::File),
            ValueKind::FolderPath => check_path(self, value, ctx, PathShape::Folder),
            ValueKind::List(element) => match value {
                Value::List(items) => {
                    for (index, item) in items.iter().enumerate() {
                        element.is_valid(item, ctx).map_err(|e| {
                            Error::validation(
                                self.type_name(),
                                format!("element {}: {}", index, e),
                            )
                        })?;
                    }
                    Ok(())
                }
                _ => Err(Error::validation(
                    self.type_name(),
                    format!("expected a list, got '{}'", value),
                )),
            },
            ValueKind::Reference(reference) => {
                check_reference(reference, value, ctx).map(|_| ())
            }
        }
    }

    /// Leniently coerce `value` to this kind.
    ///
    /// Returns the converted value on success; the input is never
    /// modified. Inconvertible input is a [`Error::Conversion`] failure.
    pub fn convert(&self, value: &Value, ctx: &ValueContext<'_>) -> Result<Value, Error> {
        if value.is_null() {
            return match self {
                ValueKind::Reference(r) if r.allow_empty => Ok(Value::Null),
                _ => Err(Error::conversion(
                    self.type_name(),
                    "null cannot be converted",
                )),
            };
        }

        match self {
            ValueKind::Text => Ok(Value::Text(value.to_string())),
            ValueKind::Integer => convert_integer(value),
            ValueKind::Float => convert_float(value),
            ValueKind::Bool => convert_bool(value),
            ValueKind::DateTime => convert_datetime(value),
            ValueKind::Guid => convert_guid(value),
            ValueKind::Color => convert_color(value),
            ValueKind::FilePath => convert_path(self, value, ctx, PathShape::File),
            ValueKind::FolderPath => convert_path(self, value, ctx, PathShape::Folder),
            ValueKind::List(element) => convert_list(self, element, value, ctx),
            ValueKind::Reference(reference) => check_reference_convert(reference, value, ctx),
        }
    }
}

fn expect_kind(kind: &ValueKind, value: &Value, ok: bool) -> Result<(), Error> {
    if ok {
        Ok(())
    } else {
        Err(Error::validation(
            kind.type_name(),
            format!("'{}' is not a native {}", value, kind.type_name()),
        ))
    }
}

fn convert_integer(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Float(f) => {
            let x = f.value();
            if x.fract() == 0.0 && x >= i64::MIN as f64 && x <= i64::MAX as f64 {
                Ok(Value::Integer(x as i64))
            } else {
                Err(Error::conversion(
                    "Integer",
                    format!("'{}' has a fractional part or is out of range", x),
                ))
            }
        }
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Value::Integer(0));
            }
            trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::conversion("Integer", format!("'{}' is not numeric", s)))
        }
        other => Err(Error::conversion(
            "Integer",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_float(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Integer(i) => Ok(Value::Float(OrderedF64::new(*i as f64))),
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Value::Float(OrderedF64::new(0.0)));
            }
            trimmed
                .parse::<f64>()
                .map(|x| Value::Float(OrderedF64::new(x)))
                .map_err(|_| Error::conversion("Float", format!("'{}' is not numeric", s)))
        }
        other => Err(Error::conversion(
            "Float",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_bool(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Integer(i) => Ok(Value::Bool(*i != 0)),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Error::conversion(
                "Bool",
                format!("'{}' is not a boolean", s),
            )),
        },
        other => Err(Error::conversion(
            "Bool",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_datetime(value: &Value) -> Result<Value, Error> {
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
        Value::Text(s) => parse_datetime(s).map(Value::DateTime),
        other => Err(Error::conversion(
            "DateTime",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_guid(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Guid(g) => Ok(Value::Guid(*g)),
        Value::Text(s) => uuid::Uuid::parse_str(s.trim())
            .map(Value::Guid)
            .map_err(|_| Error::conversion("Guid", format!("'{}' is not a guid", s))),
        other => Err(Error::conversion(
            "Guid",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_color(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Color(c) => Ok(Value::Color(*c)),
        Value::Text(s) => Color::parse(s).map(Value::Color),
        other => Err(Error::conversion(
            "Color",
            format!("'{}' cannot be converted", other),
        )),
    }
}

fn convert_list(
    kind: &ValueKind,
    element: &ValueKind,
    value: &Value,
    ctx: &ValueContext<'_>,
) -> Result<Value, Error> {
    match value {
        Value::List(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item = element.convert(item, ctx).map_err(|e| {
                    Error::conversion(kind.type_name(), format!("element {}: {}", index, e))
                })?;
                converted.push(item);
            }
            Ok(Value::List(converted))
        }
        // A lone scalar that converts under the element kind is wrapped
        // into a one-element list.
        scalar => match element.convert(scalar, ctx) {
            Ok(item) => Ok(Value::List(vec![item])),
            Err(_) => Err(Error::conversion(
                kind.type_name(),
                format!("'{}' is neither a list nor a convertible scalar", scalar),
            )),
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PathShape {
    File,
    Folder,
}

fn check_path(
    kind: &ValueKind,
    value: &Value,
    ctx: &ValueContext<'_>,
    shape: PathShape,
) -> Result<(), Error> {
    let text = match value {
        Value::Text(s) => s,
        other => {
            return Err(Error::validation(
                kind.type_name(),
                format!("'{}' is not a path", other),
            ))
        }
    };

    if let Some(policy) = ctx.paths() {
        if policy.relative && Path::new(text).is_absolute() {
            return Err(Error::validation(
                kind.type_name(),
                format!("'{}' is absolute but relative paths are required", text),
            ));
        }
    }

    check_path_exists(kind, text, ctx, shape)
}

fn check_path_exists(
    kind: &ValueKind,
    text: &str,
    ctx: &ValueContext<'_>,
    shape: PathShape,
) -> Result<(), Error> {
    // Empty paths mean "not assigned yet" and skip the existence check.
    if text.is_empty() {
        return Ok(());
    }

    let store = match ctx.store() {
        Some(store) => store,
        None => return Ok(()),
    };

    let resolved = match ctx.paths() {
        Some(policy) => policy.resolve(text),
        None => Path::new(text).to_path_buf(),
    };

    match shape {
        PathShape::File => store.file_exists(&resolved).map_err(|e| {
            Error::validation(kind.type_name(), format!("'{}': {}", text, e))
        }),
        PathShape::Folder => {
            if store.directory_exists(&resolved) {
                Ok(())
            } else {
                Err(Error::validation(
                    kind.type_name(),
                    format!("folder '{}' does not exist", text),
                ))
            }
        }
    }
}

fn convert_path(
    kind: &ValueKind,
    value: &Value,
    ctx: &ValueContext<'_>,
    shape: PathShape,
) -> Result<Value, Error> {
    let text = match value {
        Value::Text(s) => s.clone(),
        other => {
            return Err(Error::conversion(
                kind.type_name(),
                format!("'{}' cannot be converted to a path", other),
            ))
        }
    };

    let normalized = match ctx.paths() {
        Some(policy) if policy.relative && Path::new(&text).is_absolute() => {
            let rebased = Path::new(&text)
                .strip_prefix(&policy.base)
                .map_err(|_| {
                    Error::conversion(
                        kind.type_name(),
                        format!("'{}' is outside the base path '{}'", text, policy.base.display()),
                    )
                })?;
            rebased.to_string_lossy().into_owned()
        }
        _ => text,
    };

    check_path_exists(kind, &normalized, ctx, shape)
        .map_err(|e| Error::conversion(kind.type_name(), e.to_string()))?;

    Ok(Value::Text(normalized))
}

/// Strict reference check: the value must already equal one of the
/// target table's current identifier values.
fn check_reference(
    reference: &ReferenceKind,
    value: &Value,
    ctx: &ValueContext<'_>,
) -> Result<Value, Error> {
    if value.is_empty() {
        return if reference.allow_empty {
            Ok(Value::Null)
        } else {
            Err(Error::ReferentialIntegrity(format!(
                "reference to {}.{} does not allow empty values",
                reference.table, reference.attribute
            )))
        };
    }

    let (table, _) = lookup_reference_target(reference, ctx)?;
    if table.get_raw_identifier_values().contains(value) {
        Ok(value.clone())
    } else {
        Err(Error::ReferentialIntegrity(format!(
            "'{}' is not an identifier value of {}.{}",
            value, reference.table, reference.attribute
        )))
    }
}

/// Lenient reference check: the value is first coerced to the target
/// identifier's kind, then checked for membership.
fn check_reference_convert(
    reference: &ReferenceKind,
    value: &Value,
    ctx: &ValueContext<'_>,
) -> Result<Value, Error> {
    if value.is_empty() {
        return if reference.allow_empty {
            Ok(Value::Null)
        } else {
            Err(Error::ReferentialIntegrity(format!(
                "reference to {}.{} does not allow empty values",
                reference.table, reference.attribute
            )))
        };
    }

    let (table, identifier_kind) = lookup_reference_target(reference, ctx)?;
    let candidate = identifier_kind.convert(value, ctx)?;
    if table.get_raw_identifier_values().contains(&candidate) {
        Ok(candidate)
    } else {
        Err(Error::ReferentialIntegrity(format!(
            "'{}' is not an identifier value of {}.{}",
            value, reference.table, reference.attribute
        )))
    }
}

fn lookup_reference_target<'a>(
    reference: &ReferenceKind,
    ctx: &ValueContext<'a>,
) -> Result<(&'a crate::table::Table, &'a ValueKind), Error> {
    let table = ctx.table(&reference.table).ok_or_else(|| {
        Error::ReferentialIntegrity(format!(
            "table '{}' is not loaded in the catalog",
            reference.table
        ))
    })?;

    let identifier = table.identifier_attribute().ok_or_else(|| {
        Error::ReferentialIntegrity(format!(
            "table '{}' has no identifier attribute",
            reference.table
        ))
    })?;

    if identifier.name != reference.attribute {
        return Err(Error::ReferentialIntegrity(format!(
            "'{}' is not the identifier attribute of table '{}'",
            reference.attribute, reference.table
        )));
    }

    Ok((table, &identifier.kind))
}
