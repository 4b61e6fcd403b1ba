// identity/mod.rs - Identity Module

//! Cryptographically rooted agent identities.
//!
//! This module provides:
//!
//! - **Records**: immutable identity value objects with performance
//!   metrics, version history and a derived trust profile
//! - **Registry**: the keyed store issuing, resolving and revoking
//!   identities, and validating signed actions with replay protection
//! - **Store**: the JSON persistence format with schema migration
//!
//! # Example
//!
//! ```ignore
//! use trustmesh::identity::*;
//! use trustmesh::crypto::AgentKeypair;
//!
//! let keypair = AgentKeypair::generate()?;
//! let mut registry = IdentityRegistry::new();
//!
//! let record = registry.register_identity(RegisterRequest {
//!     public_key: keypair.public_key_pem.clone(),
//!     origin_system: "marketplace".into(),
//!     ..Default::default()
//! })?;
//!
//! let verdict = registry.validate_action(&ActionClaim {
//!     agent_id: Some(record.id.clone()),
//!     message: "bid 42".into(),
//!     signature: keypair.sign(b"bid 42")?,
//!     ..Default::default()
//! })?;
//! assert!(verdict.valid);
//! ```

mod record;
mod registry;
mod store;

pub use record::{
    did_for_key, AgentRecord, IdentityError, IdentityMetadata, NewIdentity, PerformanceMetrics,
    PerformanceUpdate, ProfitAndLoss, VersionEvent, ACTION_INITIALIZED, ACTION_SCHEMA_MIGRATION,
    CURRENT_SCHEMA_VERSION,
};

pub use registry::{
    ActionClaim, ActionRejection, ActionVerdict, IdentityRegistry, RegisterRequest, RegistryError,
    RegistryStats,
};

pub use store::{
    load_store, save_store, RegistryStore, StoreError, StoreMeta, StoredIdentity,
    CURRENT_STORE_SCHEMA,
};
