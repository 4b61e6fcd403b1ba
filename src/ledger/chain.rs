// ledger/chain.rs - Append-Only Activity Ledger

//! The hash-chained activity ledger.
//!
//! Entries are immutable once appended; the chain never rewrites history.
//! Signature verification runs locally against the supplied public key,
//! or - when a registry is attached - through the registry's action
//! validation, which additionally engages revocation, origin and replay
//! checks and auto-registers unknown identities.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::entry::{compute_entry_hash, LedgerEntry};
use crate::crypto::{self, check_details_keys, CanonicalError, CryptoError};
use crate::identity::{ActionClaim, ActionRejection, IdentityRegistry, RegisterRequest, RegistryError};

/// Origin tag used when auto-registering an identity the ledger has never
/// seen and the caller supplied none
pub const DEFAULT_LEDGER_ORIGIN: &str = "ledger";

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Missing required field: {0}")]
    MissingRequired(&'static str),

    #[error("Neither a signature nor a private key was supplied")]
    NoSignatureSource,

    #[error("Entry rejected: {0}")]
    Rejected(ActionRejection),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Registry lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt ledger file: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Chain verification faults
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainFault {
    #[error("Recomputed hash differs from the stored hash")]
    HashMismatch,

    #[error("Genesis entry carries a non-null prevHash")]
    GenesisPrevHashNotNull,

    #[error("prevHash does not match the previous entry's hash")]
    ChainLinkBroken,

    #[error("Entry signature does not verify")]
    InvalidSignature,
}

impl ChainFault {
    /// Machine-readable fault code
    pub fn code(&self) -> &'static str {
        match self {
            ChainFault::HashMismatch => "HASH_MISMATCH",
            ChainFault::GenesisPrevHashNotNull => "GENESIS_PREVHASH_NOT_NULL",
            ChainFault::ChainLinkBroken => "CHAIN_LINK_BROKEN",
            ChainFault::InvalidSignature => "INVALID_SIGNATURE",
        }
    }
}

/// Verification result; reports the first offending index
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerdict {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChainFault>,
}

impl ChainVerdict {
    fn ok() -> Self {
        Self {
            valid: true,
            index: None,
            reason: None,
        }
    }

    fn fault(index: u64, reason: ChainFault) -> Self {
        Self {
            valid: false,
            index: Some(index),
            reason: Some(reason),
        }
    }
}

/// Parameters for appending an entry
#[derive(Clone, Debug, Default)]
pub struct AppendRequest {
    pub agent_id: String,
    pub action_type: String,
    pub details: Value,

    /// PEM public key embedded in the entry
    pub public_key: String,

    /// When present, the hash is signed here instead of by the caller
    pub private_key: Option<String>,

    /// Caller-produced signature over the entry hash, lowercase hex
    pub signature: Option<String>,

    pub origin_system: Option<String>,
}

/// Per-action-type and population counters
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub entries: usize,
    pub distinct_agents: usize,
    pub by_action_type: std::collections::BTreeMap<String, usize>,
}

/// On-disk ledger shape
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFile {
    created_at: DateTime<Utc>,
    entries: Vec<LedgerEntry>,
}

/// The append-only, hash-chained, per-entry-signed activity ledger
pub struct ActivityLedger {
    created_at: DateTime<Utc>,
    entries: Vec<LedgerEntry>,
    registry: Option<Arc<Mutex<IdentityRegistry>>>,
}

impl ActivityLedger {
    /// Create an empty ledger with local signature verification
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            entries: Vec::new(),
            registry: None,
        }
    }

    /// Create an empty ledger routing verification through a registry
    pub fn with_registry(registry: Arc<Mutex<IdentityRegistry>>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new()
        }
    }

    /// Attach a registry; later appends verify through it
    pub fn attach_registry(&mut self, registry: Arc<Mutex<IdentityRegistry>>) {
        self.registry = Some(registry);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one agent, in chain order
    pub fn history_for(&self, agent_id: &str) -> Vec<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .collect()
    }

    /// Append a signed entry.
    ///
    /// Nothing is stored unless every check passes; a rejected entry
    /// leaves the chain untouched.
    pub fn add_entry(&mut self, request: AppendRequest) -> Result<LedgerEntry, LedgerError> {
        if request.agent_id.trim().is_empty() {
            return Err(LedgerError::MissingRequired("agentId"));
        }
        if request.action_type.trim().is_empty() {
            return Err(LedgerError::MissingRequired("actionType"));
        }
        check_details_keys(&request.details)?;

        // Clock ties on fast successive appends would trip the registry's
        // replay protection; keep append timestamps strictly increasing.
        let mut timestamp = Utc::now();
        if let Some(last) = self.entries.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp + Duration::microseconds(1);
            }
        }

        let index = self.entries.len() as u64;
        let prev_hash = self.entries.last().map(|e| e.hash.clone());
        let hash = compute_entry_hash(
            index,
            &timestamp,
            &request.agent_id,
            &request.action_type,
            &request.details,
            prev_hash.as_deref(),
        )?;

        let signature = match (&request.signature, &request.private_key) {
            (Some(signature), _) => signature.clone(),
            (None, Some(private_key)) => crypto::sign_message(private_key, hash.as_bytes())?,
            (None, None) => return Err(LedgerError::NoSignatureSource),
        };

        match &self.registry {
            Some(registry) => {
                let mut registry = registry.lock().map_err(|_| LedgerError::LockPoisoned)?;
                let claim = ActionClaim {
                    agent_id: None,
                    public_key: Some(request.public_key.clone()),
                    message: hash.clone(),
                    signature: signature.clone(),
                    timestamp: Some(timestamp.to_rfc3339()),
                    origin_system: request.origin_system.clone(),
                };

                let mut verdict = registry.validate_action(&claim)?;
                if verdict.reason == Some(ActionRejection::IdentityNotFound) {
                    registry.register_identity(RegisterRequest {
                        public_key: request.public_key.clone(),
                        origin_system: request
                            .origin_system
                            .clone()
                            .unwrap_or_else(|| DEFAULT_LEDGER_ORIGIN.to_string()),
                        ..Default::default()
                    })?;
                    debug!(agent = %request.agent_id, "Auto-registered identity for ledger append");
                    verdict = registry.validate_action(&claim)?;
                }
                if !verdict.valid {
                    let reason = verdict.reason.unwrap_or(ActionRejection::InvalidSignature);
                    return Err(LedgerError::Rejected(reason));
                }
            }
            None => {
                if let Err(e) = crypto::verify_message(&request.public_key, hash.as_bytes(), &signature)
                {
                    return Err(match e {
                        CryptoError::SignatureRejected | CryptoError::MalformedSignature(_) => {
                            LedgerError::Rejected(ActionRejection::InvalidSignature)
                        }
                        other => LedgerError::Crypto(other),
                    });
                }
            }
        }

        let entry = LedgerEntry {
            index,
            timestamp,
            agent_id: request.agent_id,
            action_type: request.action_type,
            details: request.details,
            prev_hash,
            hash,
            signature,
            public_key: request.public_key,
        };

        debug!(index, action = %entry.action_type, agent = %entry.agent_id, "Ledger entry appended");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Walk the chain and report the first fault, if any.
    ///
    /// Per entry: recomputed hash, prevHash linkage, then signature.
    pub fn verify_chain(&self) -> ChainVerdict {
        for (position, entry) in self.entries.iter().enumerate() {
            match entry.recompute_hash() {
                Ok(recomputed) if recomputed == entry.hash => {}
                _ => return ChainVerdict::fault(entry.index, ChainFault::HashMismatch),
            }

            if position == 0 {
                if entry.prev_hash.is_some() {
                    return ChainVerdict::fault(entry.index, ChainFault::GenesisPrevHashNotNull);
                }
            } else {
                let expected = &self.entries[position - 1].hash;
                if entry.prev_hash.as_deref() != Some(expected.as_str()) {
                    return ChainVerdict::fault(entry.index, ChainFault::ChainLinkBroken);
                }
            }

            if !entry.verify_signature() {
                return ChainVerdict::fault(entry.index, ChainFault::InvalidSignature);
            }
        }
        ChainVerdict::ok()
    }

    /// Write the ledger as pretty-printed UTF-8 JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), LedgerError> {
        let file = LedgerFile {
            created_at: self.created_at,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path.as_ref(), json)?;
        info!(entries = self.entries.len(), path = %path.as_ref().display(), "Ledger saved");
        Ok(())
    }

    /// Load a ledger file. The result has no registry attached.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let content = fs::read_to_string(path.as_ref())?;
        let file: LedgerFile = serde_json::from_str(&content)?;
        Ok(Self {
            created_at: file.created_at,
            entries: file.entries,
            registry: None,
        })
    }

    /// Entry and agent counters
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            entries: self.entries.len(),
            ..Default::default()
        };
        let mut agents = std::collections::BTreeSet::new();
        for entry in &self.entries {
            agents.insert(entry.agent_id.as_str());
            *stats
                .by_action_type
                .entry(entry.action_type.clone())
                .or_insert(0) += 1;
        }
        stats.distinct_agents = agents.len();
        stats
    }
}

impl Default for ActivityLedger {
    fn default() -> Self {
        Self::new()
    }
}
