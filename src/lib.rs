// lib.rs - Agent Governance Substrate
//
// A governance substrate for populations of autonomous agents:
// cryptographically rooted identities, a hash-chained activity ledger,
// deterministic trust scoring, adaptive authority tiering, pre-execution
// validation, and trust-graph analytics.

#![doc = include_str!("../README.md")]

pub mod crypto;
pub mod governance;
pub mod graph;
pub mod identity;
pub mod ledger;
pub mod observability;
pub mod platform;
pub mod scoring;

// Re-export commonly used types
pub use crypto::{sha256_hex, sign_message, verify_message, AgentKeypair, CryptoError};

pub use identity::{
    ActionClaim, ActionRejection, ActionVerdict, AgentRecord, IdentityError, IdentityRegistry,
    PerformanceMetrics, PerformanceUpdate, ProfitAndLoss, RegisterRequest, RegistryError,
};

pub use scoring::{
    evolve_metrics, score_metrics, ActionOutcome, EvolutionConfig, TrustContext, TrustProfile,
};

pub use governance::{
    governance_profile, governance_profile_for, validate_proposal, validate_with_profile,
    AuthorityTier, GovernanceProfile, Permission, Proposal, StrictnessLevel, ValidationOutcome,
};

pub use ledger::{
    ActivityLedger, AppendRequest, ChainFault, ChainVerdict, LedgerEntry, LedgerError,
};

pub use graph::{
    forecast_synergy, systemic_risk, Recommendation, SynergyForecast, SystemicRiskReport,
    TrustGraph,
};

pub use platform::{GovernanceHub, HubConfig, HubError};

pub use observability::{init_observability, LogFormat, ObservabilityConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crypto::AgentKeypair;
    pub use crate::governance::{AuthorityTier, GovernanceProfile, Proposal, ValidationOutcome};
    pub use crate::identity::{
        ActionClaim, AgentRecord, IdentityRegistry, PerformanceMetrics, RegisterRequest,
    };
    pub use crate::ledger::{ActivityLedger, AppendRequest, LedgerEntry};
    pub use crate::platform::{GovernanceHub, HubConfig};
    pub use crate::scoring::{ActionOutcome, TrustContext, TrustProfile};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
