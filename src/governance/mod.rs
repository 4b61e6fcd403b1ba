// governance/mod.rs - Adaptive Governance Module

//! Authority tiering and pre-execution validation.
//!
//! Provides:
//! - Five-tier mapping from trust score to permissions, budget and
//!   delegation rights
//! - Strictness policies parameterizing the validator
//! - The admission gate run before any proposed action executes

mod tiering;
mod validator;

pub use tiering::{
    governance_profile, governance_profile_for, tier_for_score, AuthorityTier, BudgetLimits,
    DelegationRights, DelegationScope, GovernanceProfile, Permission, StrictnessLevel,
};

pub use validator::{
    validate_proposal, validate_with_profile, CheckKind, CheckResult, Proposal, StrictnessPolicy,
    ValidationOutcome, TAG_HIGH_PRIVILEGE, TAG_INFRASTRUCTURE, TAG_SENSITIVE_DATA,
};
