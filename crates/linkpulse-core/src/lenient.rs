//! Tolerant field decoders for documents whose writers disagree on types.
//!
//! Click and link documents are produced by several generations of
//! front-end code. A field that is usually a string may arrive as a number,
//! a flag may arrive as `"true"`, and a timestamp may be an RFC 3339 string,
//! epoch milliseconds, or a `{seconds, nanos}` object. Every decoder here
//! maps an unusable shape to `None` instead of failing the whole document.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Renders a JSON scalar as a trimmed string. Empty strings, `null`,
/// arrays, and objects yield `None`.
#[must_use]
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Interprets a JSON value as a decimal amount.
///
/// Accepts numbers and numeric strings; a leading `$` and thousands
/// separators are stripped from strings.
#[must_use]
pub fn scalar_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

/// Interprets a JSON value as a boolean flag.
#[must_use]
pub fn scalar_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Interprets a JSON value as a UTC instant.
///
/// Integers are epoch milliseconds. Objects may use either the admin SDK
/// (`_seconds`/`_nanoseconds`) or the protobuf (`seconds`/`nanos`) keys.
#[must_use]
pub fn scalar_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(integer_like)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanos"))
                .and_then(integer_like)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok()?;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        _ => None,
    }
}

// Firestore's REST encoding renders int64 values as strings.
fn integer_like(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `deserialize_with` adapter for [`scalar_string`].
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(scalar_string))
}

/// `deserialize_with` adapter for [`scalar_decimal`].
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_decimal<'de, D>(de: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(scalar_decimal))
}

/// `deserialize_with` adapter for [`scalar_bool`].
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_bool<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(scalar_bool))
}

/// `deserialize_with` adapter for [`scalar_timestamp`].
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_timestamp<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(scalar_timestamp))
}

/// Decodes a nested object, yielding `None` when it does not fit `T`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_nested<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// Keeps any non-null JSON value; `null` becomes `None`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON at all.
pub fn opt_json<'de, D>(de: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Decodes `T` from a field map, dropping only the fields that cannot be
/// decoded. Returns the value and the names of the dropped fields.
///
/// A field is dropped when `T` cannot be decoded from that field alone.
/// Whatever survives is decoded together; should that still fail, the
/// result is `T::default()` with every field reported as dropped.
pub fn from_fields_lossy<T>(fields: &Map<String, Value>) -> (T, Vec<String>)
where
    T: DeserializeOwned + Default,
{
    if let Ok(value) = serde_json::from_value(Value::Object(fields.clone())) {
        return (value, Vec::new());
    }

    let mut kept = Map::new();
    let mut dropped = Vec::new();
    for (key, value) in fields {
        let single = Map::from_iter([(key.clone(), value.clone())]);
        if serde_json::from_value::<T>(Value::Object(single)).is_ok() {
            kept.insert(key.clone(), value.clone());
        } else {
            dropped.push(key.clone());
        }
    }

    match serde_json::from_value(Value::Object(kept)) {
        Ok(value) => (value, dropped),
        Err(_) => (T::default(), fields.keys().cloned().collect()),
    }
}
