//! Canonical serialization used as the exact message signed and verified.
//!
//! Callers must serialize through this path before signing or verifying,
//! never through an uncontrolled general-purpose serializer.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Recursively sort object keys lexicographically.
///
/// Array element order is preserved; scalars pass through unchanged.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&fields[key]));
            }
            Value::Object(sorted)
        }
        scalar => scalar.clone(),
    }
}

/// Byte-stable text form of `value`.
///
/// Strings are returned raw so plain messages sign without re-quoting;
/// everything else is the JSON text of the canonicalized tree. Two
/// structurally equal values differing only in key insertion order produce
/// identical output.
pub fn canonical_string(value: &Value) -> String {
    if let Value::String(text) = value {
        return text.clone();
    }
    serde_json::to_string(&canonicalize(value)).expect("in-memory serialization")
}

/// SHA-256 hex digest of the canonical text form.
pub fn content_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(value).as_bytes());
    hex::encode(hasher.finalize())
}
