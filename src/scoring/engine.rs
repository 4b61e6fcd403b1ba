// scoring/engine.rs - Trust Scoring

//! Deterministic multi-dimensional trust scoring.
//!
//! A pure function from a performance snapshot (plus optional history) to:
//! - six trust dimensions, each clamped to [0,1]
//! - five context projections (financial, collaborative, compliance,
//!   technical, security)
//! - a weighted composite
//!
//! Every emitted value is rounded to 4 decimals; the composite equals the
//! weighted sum of the rounded dimensions, re-rounded. Same inputs always
//! produce bit-identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::PerformanceMetrics;

/// Version tag stamped into score metadata
pub const SCORING_ENGINE_VERSION: &str = "1.0.0";

// Composite weights; sum to 1.0
const W_RELIABILITY: f64 = 0.15;
const W_EFFICIENCY: f64 = 0.15;
const W_COOPERATION: f64 = 0.20;
const W_COMPLIANCE: f64 = 0.20;
const W_RISK_SAFETY: f64 = 0.15;
const W_COMPETENCE: f64 = 0.15;

/// Dampener applied to riskSafety when risk exposure is trending up
const RISK_TREND_DAMPENER: f64 = 0.9;

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// The six trust dimensions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustDimensions {
    pub reliability: f64,
    pub efficiency: f64,
    pub cooperation: f64,
    pub compliance: f64,
    pub risk_safety: f64,
    pub competence: f64,
}

/// Named scoring contexts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustContext {
    Financial,
    Collaborative,
    Compliance,
    Technical,
    Security,
}

impl TrustContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustContext::Financial => "financial",
            TrustContext::Collaborative => "collaborative",
            TrustContext::Compliance => "compliance",
            TrustContext::Technical => "technical",
            TrustContext::Security => "security",
        }
    }
}

impl std::fmt::Display for TrustContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context projections of the dimension vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextScores {
    pub financial: f64,
    pub collaborative: f64,
    pub compliance: f64,
    pub technical: f64,
    pub security: f64,
}

impl ContextScores {
    /// Projection value for a named context
    pub fn get(&self, context: TrustContext) -> f64 {
        match context {
            TrustContext::Financial => self.financial,
            TrustContext::Collaborative => self.collaborative,
            TrustContext::Compliance => self.compliance,
            TrustContext::Technical => self.technical,
            TrustContext::Security => self.security,
        }
    }
}

/// Provenance attached to each computed profile
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMetadata {
    pub data_points: usize,
    pub engine_version: String,
}

/// Full scoring output
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustProfile {
    pub composite: f64,
    pub dimensions: TrustDimensions,
    pub contexts: ContextScores,
    pub timestamp: DateTime<Utc>,
    pub metadata: ScoreMetadata,
}

/// Score a performance snapshot.
///
/// `history` is the trail of prior snapshots, most recent last; it only
/// influences the riskSafety dimension (a 0.9 dampener when risk exposure
/// rose since the most recent prior snapshot) and the `data_points` count.
pub fn score_metrics(
    metrics: &PerformanceMetrics,
    history: Option<&[PerformanceMetrics]>,
) -> TrustProfile {
    let consistency = metrics.consistency.unwrap_or(metrics.reliability);
    let information_sharing = metrics
        .information_sharing_score
        .unwrap_or(metrics.cooperation_score);

    let reliability = clamp01(0.6 * metrics.uptime + 0.4 * consistency);
    let efficiency =
        clamp01(0.3 * clamp01(metrics.roi / 100.0) + 0.7 * metrics.budget_efficiency);
    let cooperation =
        clamp01(0.7 * metrics.cooperation_score + 0.3 * information_sharing);
    let compliance = clamp01(
        0.8 * (1.0 - 0.2 * f64::from(metrics.policy_violations)).max(0.0)
            + 0.2 * metrics.compliance_history,
    );

    let risk_trending_up = history
        .and_then(|h| h.last())
        .map(|prior| metrics.risk_exposure > prior.risk_exposure)
        .unwrap_or(false);
    let dampener = if risk_trending_up { RISK_TREND_DAMPENER } else { 1.0 };
    let risk_safety = clamp01((1.0 - metrics.risk_exposure) * dampener);

    let competence =
        clamp01(0.8 * metrics.task_success_rate + 0.2 * metrics.task_complexity_score);

    let dimensions = TrustDimensions {
        reliability: round4(reliability),
        efficiency: round4(efficiency),
        cooperation: round4(cooperation),
        compliance: round4(compliance),
        risk_safety: round4(risk_safety),
        competence: round4(competence),
    };

    let contexts = ContextScores {
        financial: round4(
            0.6 * dimensions.efficiency + 0.3 * dimensions.risk_safety + 0.1 * dimensions.compliance,
        ),
        collaborative: round4(
            0.7 * dimensions.cooperation
                + 0.2 * dimensions.reliability
                + 0.1 * dimensions.competence,
        ),
        compliance: round4(
            0.7 * dimensions.compliance
                + 0.2 * dimensions.risk_safety
                + 0.1 * dimensions.reliability,
        ),
        technical: round4(
            0.6 * dimensions.competence + 0.3 * dimensions.efficiency + 0.1 * dimensions.reliability,
        ),
        security: round4(
            0.5 * dimensions.compliance
                + 0.4 * dimensions.risk_safety
                + 0.1 * dimensions.reliability,
        ),
    };

    let composite = round4(
        W_RELIABILITY * dimensions.reliability
            + W_EFFICIENCY * dimensions.efficiency
            + W_COOPERATION * dimensions.cooperation
            + W_COMPLIANCE * dimensions.compliance
            + W_RISK_SAFETY * dimensions.risk_safety
            + W_COMPETENCE * dimensions.competence,
    );

    TrustProfile {
        composite,
        dimensions,
        contexts,
        timestamp: Utc::now(),
        metadata: ScoreMetadata {
            data_points: 1 + history.map_or(0, |h| h.len()),
            engine_version: SCORING_ENGINE_VERSION.to_string(),
        },
    }
}
