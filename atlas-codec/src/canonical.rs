//! Canonical JSON encoding
//!
//! Sorted object keys at every depth, no insignificant whitespace. Used for
//! signing bytes and for size accounting.

use serde_json::{Map, Value};

/// Rebuild a value with object keys sorted at every depth
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON string
pub fn canonical_json(value: &Value) -> String {
    // Serializing a Value cannot fail: keys are strings and numbers are finite.
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

/// Canonical JSON bytes
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}
