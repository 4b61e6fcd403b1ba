// identity/store.rs - Registry Persistence

//! Identity store file format and schema migration.
//!
//! The registry persists as pretty-printed UTF-8 JSON:
//!
//! ```json
//! {
//!   "identities": { "<id>": { ... } },
//!   "meta": { "schemaVersion": 2 },
//!   "lastActionTimestamps": { "<id>": 1700000000000 }
//! }
//! ```
//!
//! Trust profiles are derived data and are not persisted; they are
//! recomputed from the stored performance snapshot on load. On load, a
//! store whose `meta.schemaVersion` trails the current one has the pending
//! migrations applied in ascending order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::record::{AgentRecord, IdentityMetadata, PerformanceMetrics, CURRENT_SCHEMA_VERSION};
use crate::scoring::score_metrics;

/// Store-level schema version written to `meta.schemaVersion`
pub const CURRENT_STORE_SCHEMA: u32 = 2;

/// Errors from store persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store file: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Store metadata block
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    pub schema_version: u32,
}

/// One identity as persisted; derived trust data is omitted
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    pub id: String,
    pub public_key: String,
    pub origin_system: String,
    pub metadata: IdentityMetadata,
    pub performance: PerformanceMetrics,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&AgentRecord> for StoredIdentity {
    fn from(record: &AgentRecord) -> Self {
        Self {
            id: record.id.clone(),
            public_key: record.public_key.clone(),
            origin_system: record.origin_system.clone(),
            metadata: record.metadata.clone(),
            performance: record.performance.clone(),
            revoked: record.revoked,
            schema_version: Some(record.schema_version),
            created_at: Some(record.metadata.creation_timestamp),
            revocation_reason: record.revocation_reason.clone(),
            revocation_timestamp: record.revocation_timestamp,
            updated_at: Some(record.performance.last_updated),
        }
    }
}

impl StoredIdentity {
    /// Rehydrate a full record, recomputing the derived trust profile
    pub fn into_record(self) -> AgentRecord {
        let trust_profile = score_metrics(&self.performance, None);
        let trust_score = trust_profile.composite;

        AgentRecord {
            id: self.id,
            public_key: self.public_key,
            origin_system: self.origin_system,
            metadata: self.metadata,
            performance: self.performance,
            trust_profile,
            trust_score,
            revoked: self.revoked,
            revocation_reason: self.revocation_reason,
            revocation_timestamp: self.revocation_timestamp,
            schema_version: self.schema_version.unwrap_or(CURRENT_SCHEMA_VERSION),
        }
    }
}

/// The full on-disk registry shape
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStore {
    pub identities: BTreeMap<String, StoredIdentity>,
    pub meta: StoreMeta,

    /// Replay watermarks as epoch milliseconds
    pub last_action_timestamps: BTreeMap<String, i64>,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self {
            identities: BTreeMap::new(),
            meta: StoreMeta {
                schema_version: CURRENT_STORE_SCHEMA,
            },
            last_action_timestamps: BTreeMap::new(),
        }
    }
}

type Migration = fn(&mut RegistryStore);

/// Registered store migrations, ascending by target version
const MIGRATIONS: &[(u32, Migration)] = &[(2, stamp_identity_schema_versions)];

/// v2: stamp any identity missing `schemaVersion`
fn stamp_identity_schema_versions(store: &mut RegistryStore) {
    for identity in store.identities.values_mut() {
        if identity.schema_version.is_none() {
            identity.schema_version = Some(CURRENT_SCHEMA_VERSION);
        }
    }
}

/// Write a store as pretty-printed JSON
pub fn save_store(path: &Path, store: &RegistryStore) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(store)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a store, applying any pending schema migrations
pub fn load_store(path: &Path) -> Result<RegistryStore, StoreError> {
    let content = fs::read_to_string(path)?;
    let mut store: RegistryStore = serde_json::from_str(&content)?;

    if store.meta.schema_version < CURRENT_STORE_SCHEMA {
        for (version, migrate) in MIGRATIONS {
            if *version > store.meta.schema_version {
                migrate(&mut store);
                info!(version, "Applied registry store migration");
            }
        }
        store.meta.schema_version = CURRENT_STORE_SCHEMA;
    }

    Ok(store)
}
