// platform/hub.rs - Governance Hub

//! The governance hub wires the substrate together.
//!
//! It owns the identity registry and the activity ledger (verification
//! routed through the registry), runs scoring and reputation evolution,
//! derives governance profiles, gates proposals, and serves the graph
//! analytics - the single entry point an embedding host talks to.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::governance::{
    governance_profile_for, validate_with_profile, GovernanceProfile, Proposal, ValidationOutcome,
};
use crate::graph::{
    discover_opportunities, forecast_synergy, systemic_risk, CollaborationProposal,
    SynergyForecast, SystemicRiskReport, TrustGraph,
};
use crate::identity::{
    ActionClaim, ActionVerdict, AgentRecord, IdentityError, IdentityRegistry, RegisterRequest,
    RegistryError, RegistryStats,
};
use crate::ledger::{ActivityLedger, AppendRequest, ChainVerdict, LedgerEntry, LedgerError, LedgerStats};
use crate::observability::{
    record_action_rejected, record_action_validated, record_identity_registered,
    record_identity_revoked, record_ledger_append, record_proposal_rejected, record_trust_score,
};
use crate::scoring::{evolve_metrics, ActionOutcome, EvolutionConfig, TrustContext, TrustProfile};

/// Hub-level errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

/// Hub configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    /// Origin tag stamped on registrations that carry none
    pub origin_system: String,

    /// Registry store file; in-memory when absent
    pub registry_path: Option<PathBuf>,

    /// Ledger file, saved after every append; in-memory when absent
    pub ledger_path: Option<PathBuf>,

    pub evolution: EvolutionConfig,

    /// Cap on proposals returned by opportunity discovery
    pub opportunity_limit: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            origin_system: "governance-hub".to_string(),
            registry_path: None,
            ledger_path: None,
            evolution: EvolutionConfig::default(),
            opportunity_limit: 5,
        }
    }
}

/// Combined population counters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub registry: RegistryStats,
    pub ledger: LedgerStats,
}

/// The governance substrate facade
pub struct GovernanceHub {
    config: HubConfig,
    registry: Arc<Mutex<IdentityRegistry>>,
    ledger: ActivityLedger,
}

impl GovernanceHub {
    /// Create a hub, loading registry and ledger state from the configured
    /// paths when present
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        let registry = match &config.registry_path {
            Some(path) => IdentityRegistry::open(path)?,
            None => IdentityRegistry::new(),
        };
        let registry = Arc::new(Mutex::new(registry));

        let mut ledger = match &config.ledger_path {
            Some(path) if path.exists() => ActivityLedger::load_from_file(path)?,
            _ => ActivityLedger::new(),
        };
        ledger.attach_registry(Arc::clone(&registry));

        info!(
            origin = %config.origin_system,
            entries = ledger.len(),
            "Governance hub ready"
        );
        Ok(Self {
            config,
            registry,
            ledger,
        })
    }

    fn registry(&self) -> Result<MutexGuard<'_, IdentityRegistry>, HubError> {
        self.registry.lock().map_err(|_| HubError::LockPoisoned)
    }

    fn record_of(&self, agent_id: &str) -> Result<AgentRecord, HubError> {
        self.registry()?
            .get_by_id(agent_id)
            .cloned()
            .ok_or_else(|| HubError::UnknownAgent(agent_id.to_string()))
    }

    /// Register an agent; the hub origin applies when the request has none
    pub fn register_agent(&mut self, mut request: RegisterRequest) -> Result<AgentRecord, HubError> {
        if request.origin_system.trim().is_empty() {
            request.origin_system = self.config.origin_system.clone();
        }
        let record = self.registry()?.register_identity(request)?;
        record_identity_registered();
        record_trust_score(&record.id, record.trust_score);
        Ok(record)
    }

    /// Validate a signed action claim (revocation, origin, replay,
    /// signature)
    pub fn validate_identity_signature(
        &mut self,
        claim: &ActionClaim,
    ) -> Result<ActionVerdict, HubError> {
        let verdict = self.registry()?.validate_action(claim)?;
        match verdict.reason {
            None => record_action_validated(),
            Some(reason) => record_action_rejected(reason.code()),
        }
        Ok(verdict)
    }

    /// Revoke an agent
    pub fn revoke_agent(&mut self, agent_id: &str, reason: &str) -> Result<AgentRecord, HubError> {
        let record = self.registry()?.revoke_identity(agent_id, reason)?;
        record_identity_revoked();
        Ok(record)
    }

    /// The agent's current trust profile
    pub fn get_trust_score(&self, agent_id: &str) -> Result<TrustProfile, HubError> {
        Ok(self.record_of(agent_id)?.trust_profile)
    }

    /// Evolve an agent's reputation from its recent action window.
    ///
    /// Runs decay + action impact, rescores, and writes the successor
    /// record back to the registry.
    pub fn update_reputation(
        &mut self,
        agent_id: &str,
        recent_actions: &[ActionOutcome],
    ) -> Result<TrustProfile, HubError> {
        let record = self.record_of(agent_id)?;
        let evolved = evolve_metrics(
            &record.performance,
            recent_actions,
            Utc::now(),
            &self.config.evolution,
        );
        let next = record.with_performance(evolved, "REPUTATION_EVOLUTION")?;
        let profile = next.trust_profile.clone();

        self.registry()?.update_record(next)?;
        record_trust_score(agent_id, profile.composite);
        info!(agent = %agent_id, composite = profile.composite, "Reputation updated");
        Ok(profile)
    }

    /// Append a signed action to the ledger (registry-routed verification)
    pub fn record_action(&mut self, request: AppendRequest) -> Result<LedgerEntry, HubError> {
        let entry = self.ledger.add_entry(request)?;
        record_ledger_append();
        if let Some(path) = &self.config.ledger_path {
            self.ledger.save_to_file(path)?;
        }
        Ok(entry)
    }

    /// Ledger history, optionally filtered to one agent
    pub fn get_activity_history(&self, agent_id: Option<&str>) -> Vec<LedgerEntry> {
        match agent_id {
            Some(id) => self.ledger.history_for(id).into_iter().cloned().collect(),
            None => self.ledger.entries().to_vec(),
        }
    }

    /// Verify the full ledger chain
    pub fn verify_ledger(&self) -> ChainVerdict {
        self.ledger.verify_chain()
    }

    /// Build the trust graph from the current ledger snapshot, with
    /// registry profiles stamped on
    pub fn get_trust_graph(&self) -> Result<TrustGraph, HubError> {
        let registry = self.registry()?;
        Ok(TrustGraph::from_ledger_with_registry(&self.ledger, &registry))
    }

    /// Synergy forecast for an agent pair
    pub fn forecast_synergy(&self, agent_a: &str, agent_b: &str) -> Result<SynergyForecast, HubError> {
        Ok(forecast_synergy(&self.get_trust_graph()?, agent_a, agent_b))
    }

    /// System-wide risk report
    pub fn forecast_systemic_risk(&self) -> Result<SystemicRiskReport, HubError> {
        Ok(systemic_risk(&self.get_trust_graph()?))
    }

    /// Collaboration proposals from hidden synergies
    pub fn discover_opportunities(&self) -> Result<Vec<CollaborationProposal>, HubError> {
        Ok(discover_opportunities(
            &self.get_trust_graph()?,
            self.config.opportunity_limit,
        ))
    }

    /// Governance profile for an agent, optionally context-projected
    pub fn governance_profile_of(
        &self,
        agent_id: &str,
        context: Option<TrustContext>,
    ) -> Result<GovernanceProfile, HubError> {
        let record = self.record_of(agent_id)?;
        Ok(governance_profile_for(&record.trust_profile, context))
    }

    /// Gate a proposal through the pre-execution validator
    pub fn validate_proposal(
        &self,
        agent_id: &str,
        proposal: &Proposal,
        context: Option<TrustContext>,
    ) -> Result<ValidationOutcome, HubError> {
        let profile = self.governance_profile_of(agent_id, context)?;
        let outcome = validate_with_profile(&profile, proposal, profile.trust_score_snapshot);
        if !outcome.allowed {
            record_proposal_rejected();
        }
        Ok(outcome)
    }

    pub fn ledger(&self) -> &ActivityLedger {
        &self.ledger
    }

    pub fn stats(&self) -> Result<HubStats, HubError> {
        Ok(HubStats {
            registry: self.registry()?.stats(),
            ledger: self.ledger.stats(),
        })
    }
}
