//! Decoding of Firestore REST typed values into plain JSON.
//!
//! The REST API wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "LA"}` or `{"integerValue": "42"}`. The pipeline's
//! domain types deserialize from plain JSON, so documents are unwrapped here
//! once, at the edge.
//!
//! | Firestore type    | JSON result                            |
//! |-------------------|----------------------------------------|
//! | `nullValue`       | `null`                                 |
//! | `booleanValue`    | bool                                   |
//! | `integerValue`    | number (sent as a string on the wire)  |
//! | `doubleValue`     | number; `NaN`/`Infinity` become `null` |
//! | `timestampValue`  | RFC 3339 string                        |
//! | `stringValue`     | string                                 |
//! | `bytesValue`      | base64 string, left encoded            |
//! | `referenceValue`  | document path string                   |
//! | `geoPointValue`   | `{latitude, longitude}`                |
//! | `arrayValue`      | array                                  |
//! | `mapValue`        | object                                 |
//!
//! Inside a document, a field or array entry that cannot be decoded (an
//! unknown tag such as `vectorValue`, or a payload that does not match its
//! tag) becomes `null` and is logged, so one odd field never costs the
//! rest of the document.

use serde_json::{Map, Number, Value};

use crate::error::FirestoreError;

fn invalid(message: impl Into<String>) -> FirestoreError {
    FirestoreError::InvalidDocument(message.into())
}

/// Unwraps one typed value. Nested entries are decoded leniently.
///
/// # Errors
///
/// Returns [`FirestoreError::InvalidDocument`] when `typed` itself is not a
/// single-key object with a known type tag, or its payload does not match
/// its tag.
pub fn decode_value(typed: &Value) -> Result<Value, FirestoreError> {
    let object = typed
        .as_object()
        .ok_or_else(|| invalid(format!("expected a typed value object, got {typed}")))?;
    let Some((tag, payload)) = object.iter().next() else {
        return Err(invalid("empty typed value object"));
    };

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("booleanValue must be a bool")),
        "integerValue" => {
            let parsed = match payload {
                Value::String(s) => s
                    .parse::<i64>()
                    .map_err(|e| invalid(format!("invalid integerValue '{s}': {e}")))?,
                Value::Number(n) => n
                    .as_i64()
                    .ok_or_else(|| invalid("integerValue out of range"))?,
                _ => return Err(invalid("integerValue must be a string or number")),
            };
            Ok(Value::from(parsed))
        }
        "doubleValue" => {
            let parsed = match payload {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => return Err(invalid("doubleValue must be a number or string")),
            };
            Ok(parsed
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number))
        }
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => payload
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| invalid(format!("{tag} must be a string"))),
        "geoPointValue" => {
            let coordinate = |key: &str| {
                payload
                    .get(key)
                    .and_then(Value::as_f64)
                    .unwrap_or_default()
            };
            let mut point = Map::new();
            point.insert("latitude".to_owned(), Value::from(coordinate("latitude")));
            point.insert("longitude".to_owned(), Value::from(coordinate("longitude")));
            Ok(Value::Object(point))
        }
        "arrayValue" => {
            // An empty array is sent as `{}` with no `values` key.
            let values = match payload.get("values") {
                Some(Value::Array(entries)) => entries
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| decode_or_null(&format!("[{i}]"), entry))
                    .collect(),
                Some(_) => return Err(invalid("arrayValue.values must be an array")),
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match payload.get("fields") {
            Some(fields) => decode_fields(fields).map(Value::Object),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(invalid(format!("unknown Firestore value type '{other}'"))),
    }
}

/// Unwraps a document's `fields` object. Fields that fail [`decode_value`]
/// are kept as `null`.
///
/// # Errors
///
/// Returns [`FirestoreError::InvalidDocument`] when `fields` is not an
/// object.
pub fn decode_fields(fields: &Value) -> Result<Map<String, Value>, FirestoreError> {
    let object = fields
        .as_object()
        .ok_or_else(|| invalid("document fields must be an object"))?;
    Ok(object
        .iter()
        .map(|(key, typed)| (key.clone(), decode_or_null(key, typed)))
        .collect())
}

fn decode_or_null(path: &str, typed: &Value) -> Value {
    decode_value(typed).unwrap_or_else(|e| {
        tracing::warn!(field = path, error = %e, "undecodable Firestore value; treating as null");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode_value(&json!({"nullValue": null})).unwrap(), json!(null));
        assert_eq!(decode_value(&json!({"booleanValue": true})).unwrap(), json!(true));
        assert_eq!(decode_value(&json!({"integerValue": "42"})).unwrap(), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 4.5})).unwrap(), json!(4.5));
        assert_eq!(decode_value(&json!({"stringValue": "LA"})).unwrap(), json!("LA"));
        assert_eq!(
            decode_value(&json!({"timestampValue": "2025-06-01T10:00:00.123Z"})).unwrap(),
            json!("2025-06-01T10:00:00.123Z")
        );
    }

    #[test]
    fn non_finite_doubles_become_null() {
        assert_eq!(decode_value(&json!({"doubleValue": "NaN"})).unwrap(), json!(null));
        assert_eq!(
            decode_value(&json!({"doubleValue": "Infinity"})).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn decodes_nested_map_and_array() {
        let typed = json!({
            "mapValue": {"fields": {
                "cityName": {"stringValue": "Austin"},
                "state": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {
                        "isoCode": {"stringValue": "TX"},
                        "name": {"stringValue": "Texas"}
                    }}}
                ]}}
            }}
        });
        assert_eq!(
            decode_value(&typed).unwrap(),
            json!({"cityName": "Austin", "state": [{"isoCode": "TX", "name": "Texas"}]})
        );
    }

    #[test]
    fn empty_containers_omit_their_inner_keys() {
        assert_eq!(decode_value(&json!({"arrayValue": {}})).unwrap(), json!([]));
        assert_eq!(decode_value(&json!({"mapValue": {}})).unwrap(), json!({}));
    }

    #[test]
    fn decodes_geo_point() {
        let typed = json!({"geoPointValue": {"latitude": 34.05, "longitude": -118.24}});
        assert_eq!(
            decode_value(&typed).unwrap(),
            json!({"latitude": 34.05, "longitude": -118.24})
        );
    }

    #[test]
    fn rejects_unknown_tags_and_bad_payloads() {
        assert!(decode_value(&json!({"vectorValue": {}})).is_err());
        assert!(decode_value(&json!({"integerValue": "forty"})).is_err());
        assert!(decode_value(&json!({"booleanValue": "yes"})).is_err());
        assert!(decode_value(&json!("plain")).is_err());
        assert!(decode_value(&json!({})).is_err());
    }

    #[test]
    fn undecodable_fields_become_null_and_keep_siblings() {
        let fields = decode_fields(&json!({
            "shortId": {"stringValue": "abc123"},
            "embedding": {"vectorValue": {}},
            "count": {"integerValue": "forty"}
        }))
        .unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({"shortId": "abc123", "embedding": null, "count": null})
        );
    }

    #[test]
    fn undecodable_nested_entries_become_null() {
        let typed = json!({"mapValue": {"fields": {
            "tags": {"arrayValue": {"values": [
                {"stringValue": "a"},
                {"vectorValue": {}}
            ]}},
            "city": {"booleanValue": "LA"}
        }}});
        assert_eq!(
            decode_value(&typed).unwrap(),
            json!({"tags": ["a", null], "city": null})
        );
    }

    #[test]
    fn fields_must_be_an_object() {
        assert!(decode_fields(&json!(["shortId"])).is_err());
    }
}
