use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a JSON payload, used to decide whether a remote
/// source actually changed since the last extraction.
///
/// `serde_json::Value` keeps object keys in a `BTreeMap`, so serializing the
/// value yields a canonical key order at every nesting level and two
/// structurally equal payloads hash identically regardless of the key order
/// they arrived in.
pub fn fingerprint(payload: &Value) -> String {
    let canonical = payload.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let v: Value = serde_json::json!({"a": 1});
        assert_eq!(fingerprint(&v), fingerprint(&v));
    }

    #[test]
    fn key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn nested_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"outer": {"x": 1, "y": [1, 2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"outer": {"y": [1, 2], "x": 1}}"#).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn value_difference_changes_digest() {
        let a: Value = serde_json::json!({"a": 1});
        let b: Value = serde_json::json!({"a": 2});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn digest_is_64_hex_characters() {
        let digest = fingerprint(&serde_json::json!({}));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
