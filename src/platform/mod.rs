// platform/mod.rs - Platform Module

//! The governance hub facade tying registry, ledger, scoring, governance
//! and graph analytics together behind one entry point.
//!
//! # Example
//!
//! ```ignore
//! use trustmesh::platform::{GovernanceHub, HubConfig};
//!
//! let mut hub = GovernanceHub::new(HubConfig::default())?;
//! let record = hub.register_agent(RegisterRequest {
//!     public_key: keypair.public_key_pem.clone(),
//!     ..Default::default()
//! })?;
//! let score = hub.get_trust_score(&record.id)?;
//! ```

mod hub;

pub use hub::{GovernanceHub, HubConfig, HubError, HubStats};
