// identity/registry.rs - Identity Registry

//! The registry owns the population of identities.
//!
//! Provides:
//! - Registration with origin-conflict detection and `force` override
//! - Lookup by id or public key
//! - Revocation (terminal)
//! - Signed-action validation with per-identity replay protection
//! - Identity migration and store-schema migration on load
//!
//! When a store path is attached, every mutation persists before it
//! commits: a failed write rolls the in-memory state back so memory never
//! runs ahead of disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::record::{AgentRecord, IdentityError, IdentityMetadata, NewIdentity, PerformanceMetrics,
    ACTION_SCHEMA_MIGRATION};
use super::store::{self, RegistryStore, StoreError, StoredIdentity};
use crate::crypto::key_fingerprint;

/// Registry-level errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Public key already bound to origin '{existing_origin}'")]
    OriginConflict { existing_origin: String },

    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reasons a signed action is rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionRejection {
    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Identity has been revoked")]
    IdentityRevoked,

    #[error("Origin system does not match the registered origin")]
    OriginMismatch,

    #[error("Timestamp is not valid ISO-8601")]
    InvalidTimestamp,

    #[error("Timestamp not newer than the last validated action")]
    ReplayDetected,

    #[error("Signature verification failed")]
    InvalidSignature,
}

impl ActionRejection {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ActionRejection::IdentityNotFound => "IDENTITY_NOT_FOUND",
            ActionRejection::IdentityRevoked => "IDENTITY_REVOKED",
            ActionRejection::OriginMismatch => "ORIGIN_MISMATCH",
            ActionRejection::InvalidTimestamp => "INVALID_TIMESTAMP",
            ActionRejection::ReplayDetected => "REPLAY_DETECTED",
            ActionRejection::InvalidSignature => "INVALID_SIGNATURE",
        }
    }
}

/// A signed action submitted for validation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionClaim {
    /// Resolve by id; `public_key` is tried when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    pub message: String,

    /// Lowercase-hex RSA-PSS signature over `message`
    pub signature: String,

    /// ISO-8601; engages replay protection when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_system: Option<String>,
}

/// Outcome of validating a signed action
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionVerdict {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ActionRejection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<AgentRecord>,
}

impl ActionVerdict {
    fn rejected(reason: ActionRejection) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            identity: None,
        }
    }
}

/// Registration parameters
#[derive(Clone, Debug, Default)]
pub struct RegisterRequest {
    pub public_key: String,
    pub origin_system: String,
    pub id: Option<String>,
    pub metadata: Option<IdentityMetadata>,
    pub performance: Option<PerformanceMetrics>,

    /// Permit re-binding an existing key to a new origin
    pub force: bool,
}

/// Registry population counters
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub revoked: usize,
}

/// Keyed persistent identity store
pub struct IdentityRegistry {
    identities: HashMap<String, AgentRecord>,

    /// Public-key fingerprint -> identity id
    key_index: HashMap<String, String>,

    /// Replay watermarks; strictly increasing per identity
    last_action: HashMap<String, DateTime<Utc>>,

    store_path: Option<PathBuf>,
}

impl IdentityRegistry {
    /// Create an empty in-memory registry
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
            key_index: HashMap::new(),
            last_action: HashMap::new(),
            store_path: None,
        }
    }

    /// Open a registry backed by a store file.
    ///
    /// Loads the file if it exists (applying pending schema migrations);
    /// otherwise starts empty. Every later mutation persists to the path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        let mut registry = Self::new();

        if path.exists() {
            let store = store::load_store(&path)?;
            for (id, stored) in store.identities {
                let record = stored.into_record();
                registry.key_index.insert(record.fingerprint(), id.clone());
                registry.identities.insert(id, record);
            }
            for (id, epoch_ms) in store.last_action_timestamps {
                if let Some(ts) = DateTime::<Utc>::from_timestamp_millis(epoch_ms) {
                    registry.last_action.insert(id, ts);
                }
            }
            info!(
                identities = registry.identities.len(),
                path = %path.display(),
                "Registry loaded"
            );
        }

        registry.store_path = Some(path);
        Ok(registry)
    }

    fn snapshot(&self) -> RegistryStore {
        let mut store = RegistryStore::default();
        for (id, record) in &self.identities {
            store.identities.insert(id.clone(), StoredIdentity::from(record));
        }
        for (id, ts) in &self.last_action {
            store
                .last_action_timestamps
                .insert(id.clone(), ts.timestamp_millis());
        }
        store
    }

    fn persist(&self) -> Result<(), RegistryError> {
        if let Some(path) = &self.store_path {
            store::save_store(path, &self.snapshot())?;
        }
        Ok(())
    }

    /// Register a new identity.
    ///
    /// Idempotent for an already-registered key under the same origin.
    /// A key bound to a different origin is rejected unless `force` is set.
    pub fn register_identity(
        &mut self,
        request: RegisterRequest,
    ) -> Result<AgentRecord, RegistryError> {
        if request.public_key.trim().is_empty() {
            return Err(IdentityError::MissingRequired("publicKey").into());
        }
        if request.origin_system.trim().is_empty() {
            return Err(IdentityError::MissingRequired("originSystem").into());
        }

        let fingerprint = key_fingerprint(&request.public_key);
        let displaced = if let Some(existing_id) = self.key_index.get(&fingerprint) {
            let existing = &self.identities[existing_id];
            if existing.origin_system == request.origin_system {
                return Ok(existing.clone());
            }
            if !request.force {
                warn!(
                    id = %existing.id,
                    origin = %existing.origin_system,
                    "Registration refused: key already bound elsewhere"
                );
                return Err(RegistryError::OriginConflict {
                    existing_origin: existing.origin_system.clone(),
                });
            }
            let existing_id = existing_id.clone();
            self.identities.remove(&existing_id).map(|r| (existing_id, r))
        } else {
            None
        };

        let record = AgentRecord::new(NewIdentity {
            public_key: request.public_key,
            origin_system: request.origin_system,
            id: request.id,
            metadata: request.metadata,
            performance: request.performance,
        })?;

        self.key_index.insert(fingerprint.clone(), record.id.clone());
        self.identities.insert(record.id.clone(), record.clone());

        if let Err(e) = self.persist() {
            // Roll back so memory never runs ahead of disk
            self.identities.remove(&record.id);
            match displaced {
                Some((old_id, old_record)) => {
                    self.key_index.insert(fingerprint, old_id.clone());
                    self.identities.insert(old_id, old_record);
                }
                None => {
                    self.key_index.remove(&fingerprint);
                }
            }
            return Err(e);
        }

        info!(id = %record.id, origin = %record.origin_system, "Identity registered");
        Ok(record)
    }

    /// Lookup by identity id
    pub fn get_by_id(&self, id: &str) -> Option<&AgentRecord> {
        self.identities.get(id)
    }

    /// Lookup by PEM public key
    pub fn get_by_public_key(&self, public_key: &str) -> Option<&AgentRecord> {
        let fingerprint = key_fingerprint(public_key);
        self.key_index
            .get(&fingerprint)
            .and_then(|id| self.identities.get(id))
    }

    /// All registered identity ids
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.identities.keys()
    }

    /// Revoke an identity. Terminal: no later action validates.
    pub fn revoke_identity(
        &mut self,
        id: &str,
        reason: &str,
    ) -> Result<AgentRecord, RegistryError> {
        let record = self
            .identities
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let revoked = record.revoke(reason);
        let prior = self.identities.insert(id.to_string(), revoked.clone());

        if let Err(e) = self.persist() {
            if let Some(prior) = prior {
                self.identities.insert(id.to_string(), prior);
            }
            return Err(e);
        }

        info!(id, reason, "Identity revoked");
        Ok(revoked)
    }

    /// Replace a stored record (reputation updates, upgrades)
    pub fn update_record(&mut self, record: AgentRecord) -> Result<(), RegistryError> {
        if !self.identities.contains_key(&record.id) {
            return Err(RegistryError::NotFound(record.id));
        }
        let prior = self.identities.insert(record.id.clone(), record.clone());

        if let Err(e) = self.persist() {
            if let Some(prior) = prior {
                self.identities.insert(record.id, prior);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Validate a signed action.
    ///
    /// Checks run in a fixed order: resolution, revocation, origin,
    /// timestamp/replay, signature. The replay watermark only advances
    /// when every check passes.
    pub fn validate_action(
        &mut self,
        claim: &ActionClaim,
    ) -> Result<ActionVerdict, RegistryError> {
        let record = match &claim.agent_id {
            Some(id) => self.identities.get(id),
            None => claim
                .public_key
                .as_deref()
                .and_then(|pk| self.get_by_public_key(pk)),
        };
        let record = match record {
            Some(r) => r.clone(),
            None => return Ok(ActionVerdict::rejected(ActionRejection::IdentityNotFound)),
        };

        if record.revoked {
            return Ok(ActionVerdict::rejected(ActionRejection::IdentityRevoked));
        }

        if let Some(origin) = &claim.origin_system {
            if *origin != record.origin_system {
                return Ok(ActionVerdict::rejected(ActionRejection::OriginMismatch));
            }
        }

        let parsed_timestamp = match &claim.timestamp {
            None => None,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Err(_) => {
                    return Ok(ActionVerdict::rejected(ActionRejection::InvalidTimestamp))
                }
                Ok(ts) => {
                    let ts = ts.with_timezone(&Utc);
                    if let Some(last) = self.last_action.get(&record.id) {
                        if ts <= *last {
                            warn!(id = %record.id, "Replay detected");
                            return Ok(ActionVerdict::rejected(
                                ActionRejection::ReplayDetected,
                            ));
                        }
                    }
                    Some(ts)
                }
            },
        };

        if !record.verify_signature(claim.message.as_bytes(), &claim.signature) {
            return Ok(ActionVerdict::rejected(ActionRejection::InvalidSignature));
        }

        if let Some(ts) = parsed_timestamp {
            let prior = self.last_action.insert(record.id.clone(), ts);
            if let Err(e) = self.persist() {
                match prior {
                    Some(prior) => self.last_action.insert(record.id.clone(), prior),
                    None => self.last_action.remove(&record.id),
                };
                return Err(e);
            }
        }

        Ok(ActionVerdict {
            valid: true,
            reason: None,
            identity: Some(record),
        })
    }

    /// Apply a transformation to a deep clone of a stored record, rebuild
    /// it as a fresh identity, and write it back with a schema-migration
    /// history entry
    pub fn migrate_identity<F>(
        &mut self,
        id: &str,
        transform: F,
        details: &str,
    ) -> Result<AgentRecord, RegistryError>
    where
        F: FnOnce(AgentRecord) -> AgentRecord,
    {
        let current = self
            .identities
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?
            .clone();
        let old_fingerprint = current.fingerprint();

        let transformed = transform(current);
        let rebuilt = AgentRecord::new(NewIdentity {
            public_key: transformed.public_key.clone(),
            origin_system: transformed.origin_system.clone(),
            id: Some(transformed.id.clone()),
            metadata: Some(transformed.metadata.clone()),
            performance: Some(transformed.performance.clone()),
        })?;
        let mut migrated = rebuilt.upgrade(ACTION_SCHEMA_MIGRATION, details)?;
        migrated.revoked = transformed.revoked;
        migrated.revocation_reason = transformed.revocation_reason.clone();
        migrated.revocation_timestamp = transformed.revocation_timestamp;

        let prior = self.identities.insert(id.to_string(), migrated.clone());
        self.key_index.remove(&old_fingerprint);
        self.key_index
            .insert(migrated.fingerprint(), id.to_string());

        if let Err(e) = self.persist() {
            self.key_index.remove(&migrated.fingerprint());
            self.key_index.insert(old_fingerprint, id.to_string());
            if let Some(prior) = prior {
                self.identities.insert(id.to_string(), prior);
            }
            return Err(e);
        }

        info!(id, details, "Identity migrated");
        Ok(migrated)
    }

    /// Population counters
    pub fn stats(&self) -> RegistryStats {
        let revoked = self.identities.values().filter(|r| r.revoked).count();
        RegistryStats {
            total: self.identities.len(),
            active: self.identities.len() - revoked,
            revoked,
        }
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{test_support::test_keypair, AgentKeypair};

    fn register(registry: &mut IdentityRegistry, kp: &AgentKeypair, origin: &str) -> AgentRecord {
        registry
            .register_identity(RegisterRequest {
                public_key: kp.public_key_pem.clone(),
                origin_system: origin.into(),
                ..Default::default()
            })
            .unwrap()
    }

    fn claim(kp: &AgentKeypair, record: &AgentRecord, message: &str) -> ActionClaim {
        ActionClaim {
            agent_id: Some(record.id.clone()),
            message: message.into(),
            signature: kp.sign(message.as_bytes()).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);

        let record = register(&mut registry, &kp, "alpha");

        assert!(registry.get_by_id(&record.id).is_some());
        assert!(registry.get_by_public_key(&kp.public_key_pem).is_some());
        assert_eq!(registry.stats().total, 1);
    }

    #[test]
    fn test_same_origin_reregistration_is_idempotent() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);

        let first = register(&mut registry, &kp, "alpha");
        let second = register(&mut registry, &kp, "alpha");

        assert_eq!(first.id, second.id);
        assert_eq!(registry.stats().total, 1);
    }

    #[test]
    fn test_origin_conflict_requires_force() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        register(&mut registry, &kp, "alpha");

        let conflict = registry.register_identity(RegisterRequest {
            public_key: kp.public_key_pem.clone(),
            origin_system: "beta".into(),
            ..Default::default()
        });
        assert!(matches!(
            conflict,
            Err(RegistryError::OriginConflict { existing_origin }) if existing_origin == "alpha"
        ));

        let rebound = registry
            .register_identity(RegisterRequest {
                public_key: kp.public_key_pem.clone(),
                origin_system: "beta".into(),
                force: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rebound.origin_system, "beta");
        assert_eq!(registry.stats().total, 1);
    }

    #[test]
    fn test_missing_required_fields() {
        let mut registry = IdentityRegistry::new();

        assert!(matches!(
            registry.register_identity(RegisterRequest::default()),
            Err(RegistryError::Identity(IdentityError::MissingRequired("publicKey")))
        ));
    }

    #[test]
    fn test_validate_action_happy_path() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let verdict = registry.validate_action(&claim(&kp, &record, "hello")).unwrap();
        assert!(verdict.valid);
        assert_eq!(verdict.identity.unwrap().id, record.id);
    }

    #[test]
    fn test_unknown_identity() {
        let mut registry = IdentityRegistry::new();
        let verdict = registry
            .validate_action(&ActionClaim {
                agent_id: Some("did:agent:nobody".into()),
                message: "m".into(),
                signature: "00".into(),
                ..Default::default()
            })
            .unwrap();

        assert!(!verdict.valid);
        assert_eq!(verdict.reason, Some(ActionRejection::IdentityNotFound));
        assert_eq!(verdict.reason.unwrap().code(), "IDENTITY_NOT_FOUND");
    }

    #[test]
    fn test_revoked_identity_rejects_all_actions() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        registry.revoke_identity(&record.id, "compromised").unwrap();

        let verdict = registry.validate_action(&claim(&kp, &record, "hello")).unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.reason, Some(ActionRejection::IdentityRevoked));
    }

    #[test]
    fn test_origin_mismatch() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let mut c = claim(&kp, &record, "hello");
        c.origin_system = Some("beta".into());

        let verdict = registry.validate_action(&c).unwrap();
        assert_eq!(verdict.reason, Some(ActionRejection::OriginMismatch));
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let mut c = claim(&kp, &record, "hello");
        c.timestamp = Some("not-a-timestamp".into());

        let verdict = registry.validate_action(&c).unwrap();
        assert_eq!(verdict.reason, Some(ActionRejection::InvalidTimestamp));
    }

    #[test]
    fn test_replay_detection() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let mut c = claim(&kp, &record, "transfer 100");
        c.timestamp = Some("2026-08-01T10:00:00Z".into());

        assert!(registry.validate_action(&c).unwrap().valid);

        // Same timestamp again: replayed
        let verdict = registry.validate_action(&c).unwrap();
        assert_eq!(verdict.reason, Some(ActionRejection::ReplayDetected));

        // Earlier timestamp: also replayed
        let mut earlier = c.clone();
        earlier.timestamp = Some("2026-08-01T09:59:59Z".into());
        let verdict = registry.validate_action(&earlier).unwrap();
        assert_eq!(verdict.reason, Some(ActionRejection::ReplayDetected));

        // Strictly newer: accepted
        let mut later = c.clone();
        later.timestamp = Some("2026-08-01T10:00:01Z".into());
        assert!(registry.validate_action(&later).unwrap().valid);
    }

    #[test]
    fn test_invalid_signature() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let other = test_keypair(1);
        let record = register(&mut registry, &kp, "alpha");

        let mut c = claim(&kp, &record, "hello");
        c.signature = other.sign(b"hello").unwrap();

        let verdict = registry.validate_action(&c).unwrap();
        assert_eq!(verdict.reason, Some(ActionRejection::InvalidSignature));
    }

    #[test]
    fn test_failed_signature_does_not_advance_watermark() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let mut bad = claim(&kp, &record, "hello");
        bad.timestamp = Some("2026-08-01T10:00:00Z".into());
        bad.signature = "00ff".into();
        assert_eq!(
            registry.validate_action(&bad).unwrap().reason,
            Some(ActionRejection::InvalidSignature)
        );

        // The same timestamp still validates with a good signature
        let mut good = claim(&kp, &record, "hello");
        good.timestamp = Some("2026-08-01T10:00:00Z".into());
        assert!(registry.validate_action(&good).unwrap().valid);
    }

    #[test]
    fn test_resolution_by_public_key() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        register(&mut registry, &kp, "alpha");

        let c = ActionClaim {
            public_key: Some(kp.public_key_pem.clone()),
            message: "ping".into(),
            signature: kp.sign(b"ping").unwrap(),
            ..Default::default()
        };
        assert!(registry.validate_action(&c).unwrap().valid);
    }

    #[test]
    fn test_migrate_identity() {
        let mut registry = IdentityRegistry::new();
        let kp = test_keypair(0);
        let record = register(&mut registry, &kp, "alpha");

        let migrated = registry
            .migrate_identity(
                &record.id,
                |mut r| {
                    r.performance.task_complexity_score = 0.8;
                    r
                },
                "backfilled task complexity",
            )
            .unwrap();

        assert_eq!(migrated.performance.task_complexity_score, 0.8);
        let last = migrated.metadata.version_history.last().unwrap();
        assert_eq!(last.action, ACTION_SCHEMA_MIGRATION);

        // Written back
        let stored = registry.get_by_id(&record.id).unwrap();
        assert_eq!(stored.performance.task_complexity_score, 0.8);
    }

    #[test]
    fn test_persistence_roundtrip_with_watermarks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let kp = test_keypair(0);
        let record_id;
        {
            let mut registry = IdentityRegistry::open(&path).unwrap();
            let record = register(&mut registry, &kp, "alpha");
            record_id = record.id.clone();

            let mut c = claim(&kp, &record, "first");
            c.timestamp = Some("2026-08-01T12:00:00Z".into());
            assert!(registry.validate_action(&c).unwrap().valid);
        }

        // Reopen: identity and replay watermark both survive
        let mut reopened = IdentityRegistry::open(&path).unwrap();
        assert!(reopened.get_by_id(&record_id).is_some());

        let mut replay = ActionClaim {
            agent_id: Some(record_id),
            message: "first".into(),
            signature: kp.sign(b"first").unwrap(),
            timestamp: Some("2026-08-01T12:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(
            reopened.validate_action(&replay).unwrap().reason,
            Some(ActionRejection::ReplayDetected)
        );

        replay.timestamp = Some("2026-08-01T12:00:01Z".into());
        assert!(reopened.validate_action(&replay).unwrap().valid);
    }
}
