// ledger/entry.rs - Ledger Entries

//! Hash-chained, signed ledger entries.
//!
//! An entry is frozen at append time. Its hash covers the canonical JSON
//! of (index, timestamp, agentId, actionType, details, prevHash) in that
//! field order; the signature covers the UTF-8 bytes of the lowercase-hex
//! hash string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{self, canonical_json, sha256_hex, CanonicalError};

/// Action types with ledger-native semantics. Unknown types pass through
/// untouched.
pub mod action_types {
    pub const DELEGATION: &str = "DELEGATION";
    pub const NEGOTIATION: &str = "NEGOTIATION";
    pub const ECONOMIC: &str = "ECONOMIC";
    pub const ECONOMIC_OUTCOME: &str = "ECONOMIC_OUTCOME";
    pub const POLICY_VIOLATION: &str = "POLICY_VIOLATION";
    pub const SANDBOX_PROPOSAL: &str = "SANDBOX_PROPOSAL";
    pub const COOPERATION: &str = "COOPERATION";
    pub const COOPERATIVE_COLLABORATION: &str = "COOPERATIVE_COLLABORATION";
    pub const GOVERNANCE_PROFILE_APPLIED: &str = "GOVERNANCE_PROFILE_APPLIED";
    pub const PERMISSION_CHECK: &str = "PERMISSION_CHECK";
    pub const BUDGET_REQUEST: &str = "BUDGET_REQUEST";
}

/// One immutable entry of the activity ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub action_type: String,

    /// Opaque structured payload
    pub details: Value,

    /// Hash of the previous entry; `null` at the genesis entry
    pub prev_hash: Option<String>,

    /// SHA-256 over the canonical serialization, lowercase hex
    pub hash: String,

    /// RSA-PSS/SHA-256 signature of `hash`, lowercase hex
    pub signature: String,

    /// PEM public key the signature verifies under
    pub public_key: String,
}

/// The hashed fields in their canonical order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashPreimage<'a> {
    index: u64,
    timestamp: &'a DateTime<Utc>,
    agent_id: &'a str,
    action_type: &'a str,
    details: &'a Value,
    prev_hash: Option<&'a str>,
}

/// Canonical hash of the chain-controlled fields
pub fn compute_entry_hash(
    index: u64,
    timestamp: &DateTime<Utc>,
    agent_id: &str,
    action_type: &str,
    details: &Value,
    prev_hash: Option<&str>,
) -> Result<String, CanonicalError> {
    let preimage = canonical_json(&HashPreimage {
        index,
        timestamp,
        agent_id,
        action_type,
        details,
        prev_hash,
    })?;
    Ok(sha256_hex(preimage.as_bytes()))
}

impl LedgerEntry {
    /// Recompute the hash from the stored fields
    pub fn recompute_hash(&self) -> Result<String, CanonicalError> {
        compute_entry_hash(
            self.index,
            &self.timestamp,
            &self.agent_id,
            &self.action_type,
            &self.details,
            self.prev_hash.as_deref(),
        )
    }

    /// Verify the entry signature against the embedded public key
    pub fn verify_signature(&self) -> bool {
        crypto::verify_message(&self.public_key, self.hash.as_bytes(), &self.signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_stable_across_detail_key_order() {
        let ts: DateTime<Utc> = "2026-08-01T10:00:00Z".parse().unwrap();
        let a = compute_entry_hash(
            0,
            &ts,
            "did:agent:x",
            "DELEGATION",
            &json!({"delegatedTo": "did:agent:y", "budget": 50}),
            None,
        )
        .unwrap();
        let b = compute_entry_hash(
            0,
            &ts,
            "did:agent:x",
            "DELEGATION",
            &json!({"budget": 50, "delegatedTo": "did:agent:y"}),
            None,
        )
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let ts: DateTime<Utc> = "2026-08-01T10:00:00Z".parse().unwrap();
        let base = compute_entry_hash(1, &ts, "a", "T", &json!({"k": 1}), Some("ff")).unwrap();

        let variants = [
            compute_entry_hash(2, &ts, "a", "T", &json!({"k": 1}), Some("ff")).unwrap(),
            compute_entry_hash(1, &ts, "b", "T", &json!({"k": 1}), Some("ff")).unwrap(),
            compute_entry_hash(1, &ts, "a", "U", &json!({"k": 1}), Some("ff")).unwrap(),
            compute_entry_hash(1, &ts, "a", "T", &json!({"k": 2}), Some("ff")).unwrap(),
            compute_entry_hash(1, &ts, "a", "T", &json!({"k": 1}), Some("fe")).unwrap(),
            compute_entry_hash(1, &ts, "a", "T", &json!({"k": 1}), None).unwrap(),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn test_entry_roundtrips_through_json() {
        let ts: DateTime<Utc> = "2026-08-01T10:00:00.123Z".parse().unwrap();
        let details = json!({"counterparty": "did:agent:y", "outcome": "SUCCESS"});
        let hash = compute_entry_hash(0, &ts, "did:agent:x", "NEGOTIATION", &details, None).unwrap();

        let entry = LedgerEntry {
            index: 0,
            timestamp: ts,
            agent_id: "did:agent:x".into(),
            action_type: "NEGOTIATION".into(),
            details,
            prev_hash: None,
            hash: hash.clone(),
            signature: "00".into(),
            public_key: "pem".into(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: LedgerEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.recompute_hash().unwrap(), hash);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}
