// governance/tiering.rs - Adaptive Authority Tiering

//! Mapping from composite trust score to a discrete authority tier.
//!
//! Five tiers with monotone thresholds: a higher score never yields fewer
//! permissions or a lower budget. Each tier fixes permissions, budget
//! limits, delegation rights and the validation strictness applied to the
//! agent's proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{TrustContext, TrustProfile};

/// Discrete authority tiers, most privileged first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityTier {
    EliteAuthority,
    HighTrust,
    StandardOperational,
    Restricted,
    Probationary,
}

impl AuthorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityTier::EliteAuthority => "ELITE_AUTHORITY",
            AuthorityTier::HighTrust => "HIGH_TRUST",
            AuthorityTier::StandardOperational => "STANDARD_OPERATIONAL",
            AuthorityTier::Restricted => "RESTRICTED",
            AuthorityTier::Probationary => "PROBATIONARY",
        }
    }

    /// Minimum composite score admitting this tier
    pub fn min_composite(&self) -> f64 {
        match self {
            AuthorityTier::EliteAuthority => 0.90,
            AuthorityTier::HighTrust => 0.70,
            AuthorityTier::StandardOperational => 0.40,
            AuthorityTier::Restricted => 0.20,
            AuthorityTier::Probationary => f64::NEG_INFINITY,
        }
    }
}

impl std::fmt::Display for AuthorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissions grantable by a tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Read,
    Write,
    Execute,
    Commit,
    Govern,
    Admin,
    Sudo,
}

/// Delegation breadth granted by a tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelegationScope {
    Unrestricted,
    CrossDomain,
    DomainSpecific,
    SupervisedOnly,
    None,
}

/// Validator strictness attached to a tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrictnessLevel {
    Lax,
    Standard,
    Strict,
    HighFriction,
    MandatoryHumanInTheLoop,
}

impl StrictnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrictnessLevel::Lax => "LAX",
            StrictnessLevel::Standard => "STANDARD",
            StrictnessLevel::Strict => "STRICT",
            StrictnessLevel::HighFriction => "HIGH_FRICTION",
            StrictnessLevel::MandatoryHumanInTheLoop => "MANDATORY_HUMAN_IN_THE_LOOP",
        }
    }
}

impl std::fmt::Display for StrictnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending limits for a tier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimits {
    pub ceiling: f64,
    pub daily_limit: f64,
    pub single_transaction_limit: f64,
}

/// Delegation rights for a tier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRights {
    pub max_delegates: u32,
    pub scope: DelegationScope,
    pub allow_lower_trust: bool,

    /// Delegated actions from agents at or above this score skip review
    pub auto_approve_threshold: f64,
}

/// The full governance profile handed to an agent
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceProfile {
    pub tier: AuthorityTier,
    pub permissions: Vec<Permission>,
    pub budget: BudgetLimits,
    pub delegation: DelegationRights,
    pub strictness: StrictnessLevel,
    pub applied_at: DateTime<Utc>,
    pub trust_score_snapshot: f64,
}

impl GovernanceProfile {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Tier admitting a composite score
pub fn tier_for_score(score: f64) -> AuthorityTier {
    if score >= 0.90 {
        AuthorityTier::EliteAuthority
    } else if score >= 0.70 {
        AuthorityTier::HighTrust
    } else if score >= 0.40 {
        AuthorityTier::StandardOperational
    } else if score >= 0.20 {
        AuthorityTier::Restricted
    } else {
        AuthorityTier::Probationary
    }
}

fn tier_template(tier: AuthorityTier) -> (Vec<Permission>, BudgetLimits, DelegationRights, StrictnessLevel) {
    use Permission::*;
    match tier {
        AuthorityTier::EliteAuthority => (
            vec![Read, Write, Execute, Commit, Govern, Admin, Sudo],
            BudgetLimits {
                ceiling: 1_000_000.0,
                daily_limit: 50_000.0,
                single_transaction_limit: 10_000.0,
            },
            DelegationRights {
                max_delegates: 50,
                scope: DelegationScope::Unrestricted,
                allow_lower_trust: true,
                auto_approve_threshold: 0.85,
            },
            StrictnessLevel::Lax,
        ),
        AuthorityTier::HighTrust => (
            vec![Read, Write, Execute, Commit, Govern],
            BudgetLimits {
                ceiling: 100_000.0,
                daily_limit: 10_000.0,
                single_transaction_limit: 2_500.0,
            },
            DelegationRights {
                max_delegates: 20,
                scope: DelegationScope::CrossDomain,
                allow_lower_trust: true,
                auto_approve_threshold: 0.90,
            },
            StrictnessLevel::Standard,
        ),
        AuthorityTier::StandardOperational => (
            vec![Read, Write, Execute],
            BudgetLimits {
                ceiling: 10_000.0,
                daily_limit: 1_000.0,
                single_transaction_limit: 500.0,
            },
            DelegationRights {
                max_delegates: 5,
                scope: DelegationScope::DomainSpecific,
                allow_lower_trust: false,
                auto_approve_threshold: 0.95,
            },
            StrictnessLevel::Strict,
        ),
        AuthorityTier::Restricted => (
            vec![Read, Execute],
            BudgetLimits {
                ceiling: 1_000.0,
                daily_limit: 100.0,
                single_transaction_limit: 100.0,
            },
            DelegationRights {
                max_delegates: 1,
                scope: DelegationScope::SupervisedOnly,
                allow_lower_trust: false,
                auto_approve_threshold: 1.0,
            },
            StrictnessLevel::HighFriction,
        ),
        AuthorityTier::Probationary => (
            vec![Read],
            BudgetLimits {
                ceiling: 0.0,
                daily_limit: 0.0,
                single_transaction_limit: 0.0,
            },
            DelegationRights {
                max_delegates: 0,
                scope: DelegationScope::None,
                allow_lower_trust: false,
                auto_approve_threshold: 1.0,
            },
            StrictnessLevel::MandatoryHumanInTheLoop,
        ),
    }
}

/// Governance profile for a composite score
pub fn governance_profile(score: f64) -> GovernanceProfile {
    let tier = tier_for_score(score);
    let (permissions, budget, delegation, strictness) = tier_template(tier);

    debug!(tier = %tier, score, "Governance tier assigned");

    GovernanceProfile {
        tier,
        permissions,
        budget,
        delegation,
        strictness,
        applied_at: Utc::now(),
        trust_score_snapshot: score,
    }
}

/// Governance profile from a trust profile.
///
/// Without a context the composite decides the tier; with one, the named
/// context projection does.
pub fn governance_profile_for(
    profile: &TrustProfile,
    context: Option<TrustContext>,
) -> GovernanceProfile {
    let score = match context {
        Some(ctx) => profile.contexts.get(ctx),
        None => profile.composite,
    };
    governance_profile(score)
}
