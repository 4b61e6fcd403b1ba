// identity/record.rs - Agent Identity Records

//! Immutable agent identity records.
//!
//! A record is a value object: every change (`update_performance`,
//! `upgrade`, `revoke`) returns a new record and leaves the prior one
//! untouched. Shared immutable parts (public key, origin tag) are cloned
//! cheaply as owned strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{self, key_fingerprint};
use crate::scoring::{score_metrics, TrustProfile};

/// Identity-related errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing required field: {0}")]
    MissingRequired(&'static str),

    #[error("Malformed identity version: {0}")]
    MalformedVersion(String),
}

/// Version-history action recorded at identity creation
pub const ACTION_INITIALIZED: &str = "IDENTITY_INITIALIZED";

/// Version-history action recorded by store-schema migrations
pub const ACTION_SCHEMA_MIGRATION: &str = "SCHEMA_MIGRATION";

/// Current identity schema version stamped on new records
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Profit-and-loss snapshot; `net_profit` always equals
/// `total_revenue - total_expenses`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAndLoss {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
}

impl ProfitAndLoss {
    /// Rebuild the derived `net_profit` from revenue and expenses
    pub fn normalized(mut self) -> Self {
        self.net_profit = self.total_revenue - self.total_expenses;
        self
    }
}

/// Performance metrics backing the trust score.
///
/// All fractional metrics live in [0,1] except `roi` (unbounded, normalized
/// during scoring) and `policy_violations` (a count). `risk_exposure` is
/// inverted: 0 is safest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub reliability: f64,
    pub uptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<f64>,
    pub task_success_rate: f64,
    pub task_complexity_score: f64,
    pub budget_efficiency: f64,
    pub cooperation_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_sharing_score: Option<f64>,
    pub compliance_history: f64,
    pub risk_exposure: f64,
    pub policy_violations: u32,
    pub roi: f64,
    pub pnl: ProfitAndLoss,
    pub last_updated: DateTime<Utc>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            reliability: 1.0,
            uptime: 1.0,
            consistency: Some(1.0),
            task_success_rate: 1.0,
            task_complexity_score: 0.0,
            budget_efficiency: 1.0,
            cooperation_score: 1.0,
            information_sharing_score: None,
            compliance_history: 1.0,
            risk_exposure: 0.05,
            policy_violations: 0,
            roi: 0.0,
            pnl: ProfitAndLoss::default(),
            last_updated: Utc::now(),
        }
    }
}

/// Partial metric update; absent fields keep their current values
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceUpdate {
    pub reliability: Option<f64>,
    pub uptime: Option<f64>,
    pub consistency: Option<f64>,
    pub task_success_rate: Option<f64>,
    pub task_complexity_score: Option<f64>,
    pub budget_efficiency: Option<f64>,
    pub cooperation_score: Option<f64>,
    pub information_sharing_score: Option<f64>,
    pub compliance_history: Option<f64>,
    pub risk_exposure: Option<f64>,
    pub policy_violations: Option<u32>,
    pub roi: Option<f64>,
    pub total_revenue: Option<f64>,
    pub total_expenses: Option<f64>,
}

impl PerformanceUpdate {
    /// Merge this update over `current`, recomputing `pnl.net_profit`
    pub fn apply_to(&self, current: &PerformanceMetrics) -> PerformanceMetrics {
        let mut next = current.clone();

        if let Some(v) = self.reliability {
            next.reliability = v;
        }
        if let Some(v) = self.uptime {
            next.uptime = v;
        }
        if let Some(v) = self.consistency {
            next.consistency = Some(v);
        }
        if let Some(v) = self.task_success_rate {
            next.task_success_rate = v;
        }
        if let Some(v) = self.task_complexity_score {
            next.task_complexity_score = v;
        }
        if let Some(v) = self.budget_efficiency {
            next.budget_efficiency = v;
        }
        if let Some(v) = self.cooperation_score {
            next.cooperation_score = v;
        }
        if let Some(v) = self.information_sharing_score {
            next.information_sharing_score = Some(v);
        }
        if let Some(v) = self.compliance_history {
            next.compliance_history = v;
        }
        if let Some(v) = self.risk_exposure {
            next.risk_exposure = v;
        }
        if let Some(v) = self.policy_violations {
            next.policy_violations = v;
        }
        if let Some(v) = self.roi {
            next.roi = v;
        }
        if let Some(v) = self.total_revenue {
            next.pnl.total_revenue = v;
        }
        if let Some(v) = self.total_expenses {
            next.pnl.total_expenses = v;
        }
        next.pnl = next.pnl.normalized();
        next.last_updated = Utc::now();
        next
    }

    /// Names of the fields this update touches, for version-history details
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        macro_rules! touched {
            ($field:ident, $name:literal) => {
                if self.$field.is_some() {
                    fields.push($name);
                }
            };
        }
        touched!(reliability, "reliability");
        touched!(uptime, "uptime");
        touched!(consistency, "consistency");
        touched!(task_success_rate, "taskSuccessRate");
        touched!(task_complexity_score, "taskComplexityScore");
        touched!(budget_efficiency, "budgetEfficiency");
        touched!(cooperation_score, "cooperationScore");
        touched!(information_sharing_score, "informationSharingScore");
        touched!(compliance_history, "complianceHistory");
        touched!(risk_exposure, "riskExposure");
        touched!(policy_violations, "policyViolations");
        touched!(roi, "roi");
        touched!(total_revenue, "totalRevenue");
        touched!(total_expenses, "totalExpenses");
        fields
    }
}

/// One entry in an identity's version history
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEvent {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

/// Identity metadata: creation time, dotted version, version history
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMetadata {
    pub creation_timestamp: DateTime<Utc>,
    pub identity_version: String,
    pub version_history: Vec<VersionEvent>,
}

impl IdentityMetadata {
    fn initial() -> Self {
        let now = Utc::now();
        Self {
            creation_timestamp: now,
            identity_version: "1.0.0".to_string(),
            version_history: vec![VersionEvent {
                version: "1.0.0".to_string(),
                timestamp: now,
                action: ACTION_INITIALIZED.to_string(),
                details: "Identity record created".to_string(),
            }],
        }
    }
}

/// Bump the patch component of a three-part dotted version
fn bump_patch(version: &str) -> Result<String, IdentityError> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Err(IdentityError::MalformedVersion(version.to_string()));
    }
    let patch: u32 = parts[2]
        .parse()
        .map_err(|_| IdentityError::MalformedVersion(version.to_string()))?;
    Ok(format!("{}.{}.{}", parts[0], parts[1], patch + 1))
}

/// Parameters for constructing a fresh record
#[derive(Clone, Debug, Default)]
pub struct NewIdentity {
    pub public_key: String,
    pub origin_system: String,
    pub id: Option<String>,
    pub metadata: Option<IdentityMetadata>,
    pub performance: Option<PerformanceMetrics>,
}

/// A persistent agent identity.
///
/// The `id` is `did:agent:<hex>` where `<hex>` is the SHA-256 fingerprint
/// of the public key, unless an override was supplied at creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub public_key: String,
    pub origin_system: String,
    pub metadata: IdentityMetadata,
    pub performance: PerformanceMetrics,
    pub trust_profile: TrustProfile,
    pub trust_score: f64,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_timestamp: Option<DateTime<Utc>>,
    pub schema_version: u32,
}

impl AgentRecord {
    /// Construct a fresh identity record.
    ///
    /// Missing metadata and performance get their defaults, and the trust
    /// profile is computed immediately so a record never exists unscored.
    pub fn new(params: NewIdentity) -> Result<Self, IdentityError> {
        if params.public_key.trim().is_empty() {
            return Err(IdentityError::MissingRequired("publicKey"));
        }
        if params.origin_system.trim().is_empty() {
            return Err(IdentityError::MissingRequired("originSystem"));
        }

        let id = params
            .id
            .unwrap_or_else(|| did_for_key(&params.public_key));
        let metadata = params.metadata.unwrap_or_else(IdentityMetadata::initial);
        let performance = params
            .performance
            .map(|p| {
                let mut p = p;
                p.pnl = p.pnl.normalized();
                p
            })
            .unwrap_or_default();

        let trust_profile = score_metrics(&performance, None);
        let trust_score = trust_profile.composite;

        Ok(Self {
            id,
            public_key: params.public_key,
            origin_system: params.origin_system,
            metadata,
            performance,
            trust_profile,
            trust_score,
            revoked: false,
            revocation_reason: None,
            revocation_timestamp: None,
            schema_version: CURRENT_SCHEMA_VERSION,
        })
    }

    /// Record fingerprint of the stored public key
    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.public_key)
    }

    /// Apply a metric update, returning the successor record.
    ///
    /// Recomputes pnl and the trust profile, stamps `last_updated`, and
    /// appends an upgrade event bumping the patch version.
    pub fn update_performance(
        &self,
        update: &PerformanceUpdate,
        reason: &str,
    ) -> Result<Self, IdentityError> {
        let performance = update.apply_to(&self.performance);
        let trust_profile =
            score_metrics(&performance, Some(std::slice::from_ref(&self.performance)));
        let trust_score = trust_profile.composite;

        let detail = format!("Metrics updated: {}", update.touched_fields().join(", "));
        let mut next = Self {
            performance,
            trust_profile,
            trust_score,
            ..self.clone()
        };
        next = next.upgrade(reason, &detail)?;
        Ok(next)
    }

    /// Replace the performance snapshot wholesale (evolution output),
    /// rescoring against the prior snapshot
    pub fn with_performance(
        &self,
        performance: PerformanceMetrics,
        reason: &str,
    ) -> Result<Self, IdentityError> {
        let trust_profile =
            score_metrics(&performance, Some(std::slice::from_ref(&self.performance)));
        let trust_score = trust_profile.composite;

        let next = Self {
            performance,
            trust_profile,
            trust_score,
            ..self.clone()
        };
        next.upgrade(reason, "Metrics replaced by reputation evolution")
    }

    /// Append a version-history event and bump the patch component
    pub fn upgrade(&self, action: &str, details: &str) -> Result<Self, IdentityError> {
        let version = bump_patch(&self.metadata.identity_version)?;
        let mut metadata = self.metadata.clone();
        metadata.version_history.push(VersionEvent {
            version: version.clone(),
            timestamp: Utc::now(),
            action: action.to_string(),
            details: details.to_string(),
        });
        metadata.identity_version = version;

        Ok(Self {
            metadata,
            ..self.clone()
        })
    }

    /// Terminal revocation transition
    pub fn revoke(&self, reason: &str) -> Self {
        Self {
            revoked: true,
            revocation_reason: Some(reason.to_string()),
            revocation_timestamp: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Verify an RSA-PSS/SHA-256 signature against the stored public key
    pub fn verify_signature(&self, message: &[u8], signature_hex: &str) -> bool {
        crypto::verify_message(&self.public_key, message, signature_hex).is_ok()
    }
}

/// Derive the default identity id for a PEM public key
pub fn did_for_key(public_key_pem: &str) -> String {
    format!("did:agent:{}", key_fingerprint(public_key_pem))
}
