// governance/validator.rs - Pre-Execution Validator

//! Admission gate for proposed actions.
//!
//! A proposal is checked against the strictness policy attached to the
//! agent's governance profile. Four check families run unconditionally
//! and every failure is collected, so a rejection names all of its
//! grounds, not just the first.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::tiering::{governance_profile_for, GovernanceProfile, StrictnessLevel};
use crate::scoring::{TrustContext, TrustProfile};

/// Policy tag gating high-privilege proposals
pub const TAG_HIGH_PRIVILEGE: &str = "HIGH_PRIVILEGE";

/// Policy tag gating infrastructure proposals
pub const TAG_INFRASTRUCTURE: &str = "INFRASTRUCTURE";

/// Policy tag gating sensitive-data proposals
pub const TAG_SENSITIVE_DATA: &str = "SENSITIVE_DATA";

/// Tolerances attached to a strictness level
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrictnessPolicy {
    pub risk_tolerance: f64,
    pub safety_margin: f64,
    pub policy_intensity: f64,
    pub consensus_required: bool,
    pub min_confirmations: u32,
    pub human_approval: bool,
}

impl StrictnessLevel {
    /// The tolerance row for this strictness level
    pub fn policy(&self) -> StrictnessPolicy {
        match self {
            StrictnessLevel::Lax => StrictnessPolicy {
                risk_tolerance: 0.9,
                safety_margin: 1.05,
                policy_intensity: 0.1,
                consensus_required: false,
                min_confirmations: 0,
                human_approval: false,
            },
            StrictnessLevel::Standard => StrictnessPolicy {
                risk_tolerance: 0.6,
                safety_margin: 1.0,
                policy_intensity: 0.5,
                consensus_required: false,
                min_confirmations: 0,
                human_approval: false,
            },
            StrictnessLevel::Strict => StrictnessPolicy {
                risk_tolerance: 0.3,
                safety_margin: 0.85,
                policy_intensity: 0.8,
                consensus_required: true,
                min_confirmations: 1,
                human_approval: false,
            },
            StrictnessLevel::HighFriction => StrictnessPolicy {
                risk_tolerance: 0.1,
                safety_margin: 0.7,
                policy_intensity: 1.0,
                consensus_required: true,
                min_confirmations: 3,
                human_approval: false,
            },
            StrictnessLevel::MandatoryHumanInTheLoop => StrictnessPolicy {
                risk_tolerance: 0.0,
                safety_margin: 0.5,
                policy_intensity: 1.0,
                consensus_required: true,
                min_confirmations: 5,
                human_approval: true,
            },
        }
    }
}

/// A proposed action awaiting admission
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    #[serde(rename = "type")]
    pub proposal_type: String,

    /// Blast radius in [0,1]
    pub impact_score: f64,

    /// Failure likelihood/severity in [0,1]
    pub risk_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    #[serde(default)]
    pub policy_tags: Vec<String>,

    /// Confirmations already gathered from peers
    #[serde(default)]
    pub confirmations: u32,

    #[serde(default)]
    pub human_approved: bool,

    /// Free-form payload carried through to the ledger
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Proposal {
    pub fn new(proposal_type: &str, impact_score: f64, risk_score: f64) -> Self {
        Self {
            proposal_type: proposal_type.to_string(),
            impact_score,
            risk_score,
            cost: None,
            policy_tags: Vec::new(),
            confirmations: 0,
            human_approved: false,
            payload: Value::Null,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_tags<I: IntoIterator<Item = S>, S: Into<String>>(mut self, tags: I) -> Self {
        self.policy_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.policy_tags.iter().any(|t| t == tag)
    }
}

/// Check families run by the validator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    Risk,
    Economics,
    Policy,
    Consensus,
}

/// Result of one check family
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check: CheckKind,
    pub passed: bool,
    pub detail: String,
}

/// The validator's verdict
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub allowed: bool,
    pub strictness_level: StrictnessLevel,
    pub validation_results: Vec<CheckResult>,

    /// Joined failure details; absent when admitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Validate a proposal under an already-computed governance profile
pub fn validate_with_profile(
    profile: &GovernanceProfile,
    proposal: &Proposal,
    trust_score: f64,
) -> ValidationOutcome {
    let policy = profile.strictness.policy();
    let mut results = Vec::with_capacity(4);
    let mut failures: Vec<String> = Vec::new();

    // 1. Risk
    if proposal.risk_score > policy.risk_tolerance {
        let detail = format!(
            "risk score {:.2} exceeds tolerance {:.2}",
            proposal.risk_score, policy.risk_tolerance
        );
        failures.push(detail.clone());
        results.push(CheckResult {
            check: CheckKind::Risk,
            passed: false,
            detail,
        });
    } else {
        results.push(CheckResult {
            check: CheckKind::Risk,
            passed: true,
            detail: "risk within tolerance".to_string(),
        });
    }

    // 2. Economics
    match proposal.cost {
        None => results.push(CheckResult {
            check: CheckKind::Economics,
            passed: true,
            detail: "no cost attached".to_string(),
        }),
        Some(cost) => {
            let limit = profile.budget.single_transaction_limit * policy.safety_margin;
            if cost > limit {
                let detail = format!(
                    "cost {cost:.2} exceeds adjusted single-transaction limit {limit:.2}"
                );
                failures.push(detail.clone());
                results.push(CheckResult {
                    check: CheckKind::Economics,
                    passed: false,
                    detail,
                });
            } else {
                results.push(CheckResult {
                    check: CheckKind::Economics,
                    passed: true,
                    detail: "cost within limits".to_string(),
                });
            }
        }
    }

    // 3. Policies, gated progressively by intensity
    let intensity = policy.policy_intensity;
    let mut policy_failures: Vec<String> = Vec::new();

    if intensity > 0.4 && proposal.has_tag(TAG_HIGH_PRIVILEGE) && proposal.impact_score > 0.7 {
        policy_failures.push(format!(
            "high-privilege proposal with impact {:.2} above 0.70",
            proposal.impact_score
        ));
    }
    if intensity > 0.7 && proposal.has_tag(TAG_INFRASTRUCTURE) {
        policy_failures.push("infrastructure changes barred at this strictness".to_string());
    }
    if intensity > 0.7 && proposal.policy_tags.len() > 3 {
        policy_failures.push(format!(
            "{} policy tags exceed the allowed 3",
            proposal.policy_tags.len()
        ));
    }
    if intensity > 0.9 && proposal.has_tag(TAG_SENSITIVE_DATA) {
        policy_failures.push("sensitive-data access barred at this strictness".to_string());
    }

    if policy_failures.is_empty() {
        results.push(CheckResult {
            check: CheckKind::Policy,
            passed: true,
            detail: "no policy rule triggered".to_string(),
        });
    } else {
        let detail = policy_failures.join("; ");
        failures.push(detail.clone());
        results.push(CheckResult {
            check: CheckKind::Policy,
            passed: false,
            detail,
        });
    }

    // 4. Consensus and human approval
    let consensus_needed =
        policy.consensus_required || proposal.impact_score > 0.8 * trust_score;
    let mut consensus_failures: Vec<String> = Vec::new();

    if consensus_needed {
        let required = policy
            .min_confirmations
            .max(if proposal.impact_score > 0.7 { 2 } else { 0 });
        if proposal.confirmations < required {
            consensus_failures.push(format!(
                "{} of {} required confirmations supplied",
                proposal.confirmations, required
            ));
        }
    }
    if policy.human_approval && !proposal.human_approved {
        consensus_failures.push("human approval required but absent".to_string());
    }

    if consensus_failures.is_empty() {
        results.push(CheckResult {
            check: CheckKind::Consensus,
            passed: true,
            detail: if consensus_needed {
                "confirmations satisfied".to_string()
            } else {
                "consensus not required".to_string()
            },
        });
    } else {
        let detail = consensus_failures.join("; ");
        failures.push(detail.clone());
        results.push(CheckResult {
            check: CheckKind::Consensus,
            passed: false,
            detail,
        });
    }

    let allowed = failures.is_empty();
    if !allowed {
        debug!(
            strictness = %profile.strictness,
            proposal_type = %proposal.proposal_type,
            "Proposal rejected: {}",
            failures.join("; ")
        );
    }

    ValidationOutcome {
        allowed,
        strictness_level: profile.strictness,
        validation_results: results,
        reason: if allowed { None } else { Some(failures.join("; ")) },
    }
}

/// Validate a proposal for an agent's trust profile.
///
/// The governance profile is derived from the composite, or from the named
/// context projection when one is supplied.
pub fn validate_proposal(
    trust: &TrustProfile,
    proposal: &Proposal,
    context: Option<TrustContext>,
) -> ValidationOutcome {
    let profile = governance_profile_for(trust, context);
    validate_with_profile(&profile, proposal, profile.trust_score_snapshot)
}
