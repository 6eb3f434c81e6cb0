//! Content hashing - SHA-256 over canonical bytes.
//!
//! Every provenance check in the lock file compares these digests, so they
//! must be deterministic across runs and serialization order.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::config::Config;

/// Compute SHA-256 of bytes, return lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Digest of canonical SVG markup. Always taken over the markup bytes,
/// never over a `file://` reference to them.
pub fn content_hash(content: &str) -> String {
    sha256_hex(content.as_bytes())
}

/// Convert to canonical JSON (sorted keys, no whitespace).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Digest of the canonical serialization of a config. Stored in the lock on
/// every config write and compared against target provenance to detect
/// optimizer-rule drift.
pub fn config_hash(config: &Config) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(config)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_hash_deterministic() {
        let svg = "<svg/>";
        let h1 = content_hash(svg);
        let h2 = content_hash(svg);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a = json!({"svgStorage": {"inLock": true, "folder": null}, "optimizer": {}});
        let b = json!({"optimizer": {}, "svgStorage": {"folder": null, "inLock": true}});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }
}
