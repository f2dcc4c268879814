//! Coercion between the store's property type system and declared field
//! types, plus JSON boundary conversions.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::{DeclaredType, PropertyValue};

/// Coerce a stored (or incoming) property value to the declared type.
///
/// Returns the rejected value on failure so the caller can report its kind.
/// Only lossless conversions are performed: integers widen to floats,
/// floats narrow to integers only when they carry no fraction, RFC 3339
/// text parses to datetimes, and uuid text is re-normalized to the
/// canonical hyphenated form.
pub fn coerce(value: PropertyValue, target: &DeclaredType) -> Result<PropertyValue, PropertyValue> {
    match (target, value) {
        (DeclaredType::Text, PropertyValue::Text(text)) => Ok(PropertyValue::Text(text)),

        (DeclaredType::Integer, PropertyValue::Integer(n)) => Ok(PropertyValue::Integer(n)),
        (DeclaredType::Integer, PropertyValue::Float(f)) => {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(PropertyValue::Integer(f as i64))
            } else {
                Err(PropertyValue::Float(f))
            }
        }

        (DeclaredType::Float, PropertyValue::Float(f)) => Ok(PropertyValue::Float(f)),
        (DeclaredType::Float, PropertyValue::Integer(n)) => Ok(PropertyValue::Float(n as f64)),

        (DeclaredType::Boolean, PropertyValue::Boolean(b)) => Ok(PropertyValue::Boolean(b)),

        (DeclaredType::DateTime, PropertyValue::DateTime(ts)) => Ok(PropertyValue::DateTime(ts)),
        (DeclaredType::DateTime, PropertyValue::Text(text)) => {
            match DateTime::parse_from_rfc3339(&text) {
                Ok(parsed) => Ok(PropertyValue::DateTime(parsed.with_timezone(&Utc))),
                Err(_) => Err(PropertyValue::Text(text)),
            }
        }

        (DeclaredType::Uuid, PropertyValue::Text(text)) => match Uuid::parse_str(&text) {
            Ok(uuid) => Ok(PropertyValue::Text(uuid.to_string())),
            Err(_) => Err(PropertyValue::Text(text)),
        },

        (_, other) => Err(other),
    }
}

/// Render a property value as JSON for interchange at the mapper boundary.
pub fn property_to_json(value: &PropertyValue) -> JsonValue {
    match value {
        PropertyValue::Boolean(b) => JsonValue::Bool(*b),
        PropertyValue::Integer(n) => JsonValue::from(*n),
        PropertyValue::Float(f) => {
            serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
        }
        PropertyValue::Text(text) => JsonValue::String(text.clone()),
        PropertyValue::DateTime(ts) => JsonValue::String(ts.to_rfc3339()),
        PropertyValue::List(items) => JsonValue::Array(items.iter().map(property_to_json).collect()),
    }
}

/// Read a JSON value back into the store's property type system.
///
/// Nulls and objects have no property representation and yield `None`.
/// Strings stay text; datetime interpretation is left to [`coerce`].
pub fn property_from_json(value: &JsonValue) -> Option<PropertyValue> {
    match value {
        JsonValue::Bool(b) => Some(PropertyValue::Boolean(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(PropertyValue::Integer(i))
            } else {
                n.as_f64().map(PropertyValue::Float)
            }
        }
        JsonValue::String(text) => Some(PropertyValue::Text(text.clone())),
        JsonValue::Array(items) => items
            .iter()
            .map(property_from_json)
            .collect::<Option<Vec<_>>>()
            .map(PropertyValue::List),
        JsonValue::Null | JsonValue::Object(_) => None,
    }
}
