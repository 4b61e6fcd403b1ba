// crypto/canonical.rs - Canonical JSON Serialization

//! Canonical serialization for hashing.
//!
//! Chain hashes are only reproducible if every serialization of the same
//! entry yields the same bytes. Two rules make that hold:
//!
//! - Struct fields serialize in declaration order, which is fixed to the
//!   wire order (index, timestamp, agentId, actionType, details, prevHash).
//! - `serde_json::Value` objects keep their keys sorted, so nested maps in
//!   opaque `details` payloads are deterministic.
//!
//! Entry `details` may not use keys that collide with the chain-controlled
//! fields; a payload that did could forge a second preimage for an entry.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Field names owned by the chain; rejected inside `details` payloads
pub const RESERVED_ENTRY_KEYS: [&str; 9] = [
    "index",
    "timestamp",
    "agentId",
    "actionType",
    "details",
    "prevHash",
    "hash",
    "signature",
    "publicKey",
];

/// Errors from canonical serialization
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Details payload uses reserved key: {0}")]
    ReservedKey(String),
}

/// Serialize a value to its canonical JSON string
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    Ok(serde_json::to_string(value)?)
}

/// Reject `details` objects whose top-level keys collide with
/// chain-controlled entry fields
pub fn check_details_keys(details: &Value) -> Result<(), CanonicalError> {
    if let Value::Object(map) = details {
        for key in map.keys() {
            if RESERVED_ENTRY_KEYS.contains(&key.as_str()) {
                return Err(CanonicalError::ReservedKey(key.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_maps_serialize_sorted() {
        let a = json!({"zebra": 1, "alpha": 2, "mid": 3});
        let b = json!({"alpha": 2, "mid": 3, "zebra": 1});

        assert_eq!(
            canonical_json(&a).unwrap(),
            canonical_json(&b).unwrap()
        );
        assert_eq!(canonical_json(&a).unwrap(), r#"{"alpha":2,"mid":3,"zebra":1}"#);
    }

    #[test]
    fn test_nested_maps_are_deterministic() {
        let payload = json!({"outer": {"z": {"b": 1, "a": 2}, "a": true}});
        assert_eq!(
            canonical_json(&payload).unwrap(),
            r#"{"outer":{"a":true,"z":{"a":2,"b":1}}}"#
        );
    }

    #[test]
    fn test_reserved_keys_rejected() {
        let payload = json!({"prevHash": "forged", "amount": 10});
        assert!(matches!(
            check_details_keys(&payload),
            Err(CanonicalError::ReservedKey(k)) if k == "prevHash"
        ));

        let payload = json!({"publicKey": "-----BEGIN PUBLIC KEY-----"});
        assert!(matches!(
            check_details_keys(&payload),
            Err(CanonicalError::ReservedKey(k)) if k == "publicKey"
        ));
    }

    #[test]
    fn test_plain_payloads_pass() {
        let payload = json!({"delegatedTo": "did:agent:abc", "task": "audit"});
        assert!(check_details_keys(&payload).is_ok());

        // Non-object details are always fine
        assert!(check_details_keys(&json!("free text")).is_ok());
        assert!(check_details_keys(&json!(null)).is_ok());
    }
}
