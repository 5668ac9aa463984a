//! Cache Key Module
//!
//! Builds canonical response cache keys from an endpoint and its parameters.

use serde::Serialize;

use crate::error::{CacheError, Result};

// == Cache Key ==
/// Derives a key from the full request shape.
///
/// Parameters are serialized to JSON with object keys sorted, so two logically
/// equal requests produce the same key regardless of field order, and requests
/// that differ in any parameter produce different keys.
pub fn cache_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> Result<String> {
    let value = serde_json::to_value(params)
        .map_err(|e| CacheError::InvalidRequest(format!("Unserializable cache key params: {}", e)))?;

    Ok(format!("{}?{}", endpoint, canonical_json(&value)))
}

fn canonical_json(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            let body: Vec<String> = fields
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
