// File: livecraft-common/src/models/lenient.rs

//! Field decoders for records and payloads written by loosely typed
//! producers. A value of the wrong shape reads as the field's default
//! instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::rule::Operand;

/// Only a literal `true`.
pub(crate) fn literal_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(matches!(v, Value::Bool(true)))
}

/// Anything but a literal `false`.
pub(crate) fn not_literal_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(!matches!(v, Value::Bool(false)))
}

/// Truthiness of a loose flag: null, false, 0, NaN and "" are false.
pub(crate) fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Strings as is, numbers and booleans in their text form, anything else empty.
pub(crate) fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// A number or a numeric string, read the way rule operands are.
pub(crate) fn loose_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    let operand = match v {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Operand::Integer(i),
            None => Operand::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Operand::Text(s),
        _ => return Ok(None),
    };
    Ok(operand.as_integer())
}

/// An array, or empty for null and other shapes.
pub(crate) fn array_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}
