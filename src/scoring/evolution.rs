// scoring/evolution.rs - Reputation Evolution

//! Pure metric evolution: temporal decay, action impact, consistency
//! adjustments.
//!
//! `evolve_metrics` maps (current metrics, recent actions, now) to a new
//! snapshot. Nothing here touches storage; callers decide what to do with
//! the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::PerformanceMetrics;

/// Tunables for reputation evolution
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfig {
    /// Daily multiplicative decay applied past the grace period
    pub decay_rate_daily: f64,

    /// Hours of inactivity tolerated before decay starts
    pub decay_grace_period_hours: f64,

    /// Decay never drags a metric below this floor
    pub min_metric_floor: f64,

    /// Blend weight given to fresh action evidence
    pub recency_weight: f64,

    /// Consistency bonus multiplier for sustained quality
    pub recovery_acceleration: f64,

    /// Amplifier on the recency weight when evidence is worse than the
    /// standing metric
    pub impact_volatility: f64,

    /// Average quality at or above which the consistency bonus applies
    pub consistency_threshold: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            decay_rate_daily: 0.015,
            decay_grace_period_hours: 18.0,
            min_metric_floor: 0.15,
            recency_weight: 0.65,
            recovery_acceleration: 0.1,
            impact_volatility: 1.2,
            consistency_threshold: 0.85,
        }
    }
}

/// One recent action observed for an agent
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,

    /// Outcome quality in [0,1]; defaults to 0.95 on success, 0.2 on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,

    /// Cooperativeness in [0,1]; defaults to 0.9 on success, 0.5 on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooperation: Option<f64>,
}

impl ActionOutcome {
    /// A plain success with default quality and cooperation
    pub fn success() -> Self {
        Self {
            success: true,
            quality: None,
            cooperation: None,
        }
    }

    /// A plain failure with default quality and cooperation
    pub fn failure() -> Self {
        Self {
            success: false,
            quality: None,
            cooperation: None,
        }
    }

    fn quality_or_default(&self) -> f64 {
        self.quality
            .unwrap_or(if self.success { 0.95 } else { 0.2 })
    }

    fn cooperation_or_default(&self) -> f64 {
        self.cooperation
            .unwrap_or(if self.success { 0.9 } else { 0.5 })
    }
}

/// Aggregated view of the recent action window
#[derive(Clone, Debug, PartialEq)]
struct ActionImpact {
    success_rate: f64,
    reliability: f64,
    cooperation: f64,
    avg_quality: f64,
}

fn aggregate_actions(actions: &[ActionOutcome]) -> ActionImpact {
    let n = actions.len() as f64;
    let successes = actions.iter().filter(|a| a.success).count() as f64;
    let cooperation = actions.iter().map(ActionOutcome::cooperation_or_default).sum::<f64>() / n;
    let avg_quality = actions.iter().map(ActionOutcome::quality_or_default).sum::<f64>() / n;

    ActionImpact {
        success_rate: successes / n,
        reliability: (n / 3.0).min(1.0),
        cooperation,
        avg_quality,
    }
}

/// Blend fresh evidence into a standing metric.
///
/// Downward evidence carries the volatility-amplified weight so regressions
/// register faster than recoveries.
fn blend(old: f64, new: f64, config: &EvolutionConfig) -> f64 {
    let weight = if new < old {
        (config.recency_weight * config.impact_volatility).min(0.95)
    } else {
        config.recency_weight
    };
    (weight * new + (1.0 - weight) * old).clamp(0.0, 1.0)
}

/// Evolve a performance snapshot.
///
/// Applies temporal decay past the grace period, blends in the recent
/// action window, applies the consistency bonus/penalty, and stamps
/// `last_updated = now`.
pub fn evolve_metrics(
    current: &PerformanceMetrics,
    recent_actions: &[ActionOutcome],
    now: DateTime<Utc>,
    config: &EvolutionConfig,
) -> PerformanceMetrics {
    let mut next = current.clone();

    // 1. Temporal decay
    let elapsed_hours =
        (now - current.last_updated).num_milliseconds() as f64 / 3_600_000.0;
    if elapsed_hours > config.decay_grace_period_hours {
        let days = elapsed_hours / 24.0;
        let factor = (1.0 - config.decay_rate_daily).powf(days);
        let floor = config.min_metric_floor;

        next.reliability = (next.reliability * factor).max(floor);
        next.cooperation_score = (next.cooperation_score * factor).max(floor);
        next.consistency = Some(
            (next.consistency.unwrap_or(next.reliability) * factor).max(floor),
        );
        next.task_success_rate = (next.task_success_rate * factor).max(floor);
        next.compliance_history = (next.compliance_history * factor).max(floor);

        if next.risk_exposure < 0.4 {
            next.risk_exposure = (next.risk_exposure + 0.005 * days).min(0.4);
        }
    }

    // 2+3. Action impact and consistency adjustment
    if !recent_actions.is_empty() {
        let impact = aggregate_actions(recent_actions);

        next.task_success_rate = blend(next.task_success_rate, impact.success_rate, config);
        next.reliability = blend(next.reliability, impact.reliability, config);
        next.cooperation_score = blend(next.cooperation_score, impact.cooperation, config);

        let consistency = next.consistency.unwrap_or(next.reliability);
        if impact.avg_quality >= config.consistency_threshold {
            let bonus = config.recovery_acceleration * (impact.avg_quality - 0.5);
            next.consistency = Some((consistency + bonus).min(1.0));
            next.compliance_history = (next.compliance_history + 0.02).min(1.0);
            next.risk_exposure = (next.risk_exposure - 0.01).max(0.01);
        } else if impact.avg_quality < 0.4 {
            next.consistency = Some((consistency - 0.1).max(0.1));
        } else {
            next.consistency = Some(consistency);
        }
    }

    next.last_updated = now;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn metrics_updated_at(last_updated: DateTime<Utc>) -> PerformanceMetrics {
        PerformanceMetrics {
            last_updated,
            ..Default::default()
        }
    }

    #[test]
    fn test_within_grace_period_is_identity() {
        let now = Utc::now();
        let current = metrics_updated_at(now - Duration::hours(10));

        let evolved = evolve_metrics(&current, &[], now, &EvolutionConfig::default());

        assert_eq!(evolved.reliability, current.reliability);
        assert_eq!(evolved.cooperation_score, current.cooperation_score);
        assert_eq!(evolved.consistency, current.consistency);
        assert_eq!(evolved.task_success_rate, current.task_success_rate);
        assert_eq!(evolved.compliance_history, current.compliance_history);
        assert_eq!(evolved.risk_exposure, current.risk_exposure);
        assert_eq!(evolved.last_updated, now);
    }

    #[test]
    fn test_ten_day_decay() {
        let now = Utc::now();
        let current = metrics_updated_at(now - Duration::days(10));

        let evolved = evolve_metrics(&current, &[], now, &EvolutionConfig::default());

        // (1 - 0.015)^10
        let expected = 0.985f64.powf(10.0);
        assert!((evolved.reliability - expected).abs() < 1e-9);
        assert!((evolved.task_success_rate - expected).abs() < 1e-9);
        assert!((evolved.consistency.unwrap() - expected).abs() < 1e-9);
        assert!((expected - 0.8597).abs() < 1e-3);

        // Risk drifts up by 0.005/day
        assert!((evolved.risk_exposure - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decay_floors() {
        let now = Utc::now();
        let mut current = metrics_updated_at(now - Duration::days(365));
        current.reliability = 0.5;

        let evolved = evolve_metrics(&current, &[], now, &EvolutionConfig::default());
        assert_eq!(evolved.reliability, 0.15);
    }

    #[test]
    fn test_risk_drift_capped() {
        let now = Utc::now();
        let mut current = metrics_updated_at(now - Duration::days(200));
        current.risk_exposure = 0.35;

        let evolved = evolve_metrics(&current, &[], now, &EvolutionConfig::default());
        assert_eq!(evolved.risk_exposure, 0.4);

        // Already past the cap: untouched
        current.risk_exposure = 0.7;
        let evolved = evolve_metrics(&current, &[], now, &EvolutionConfig::default());
        assert_eq!(evolved.risk_exposure, 0.7);
    }

    #[test]
    fn test_failures_drag_metrics_down_fast() {
        let now = Utc::now();
        let current = metrics_updated_at(now);
        let actions = vec![ActionOutcome::failure(), ActionOutcome::failure()];

        let evolved = evolve_metrics(&current, &actions, now, &EvolutionConfig::default());

        // success rate 0 blended at the amplified weight 0.78
        assert!((evolved.task_success_rate - 0.22).abs() < 1e-9);
        // avg quality 0.2 < 0.4: consistency penalty
        assert!((evolved.consistency.unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_quality_bonus() {
        let now = Utc::now();
        let mut current = metrics_updated_at(now);
        current.consistency = Some(0.8);
        current.compliance_history = 0.9;
        current.risk_exposure = 0.2;

        let actions: Vec<ActionOutcome> = (0..4)
            .map(|_| ActionOutcome {
                success: true,
                quality: Some(0.95),
                cooperation: None,
            })
            .collect();

        let evolved = evolve_metrics(&current, &actions, now, &EvolutionConfig::default());

        // bonus = 0.1 * (0.95 - 0.5)
        assert!((evolved.consistency.unwrap() - 0.845).abs() < 1e-9);
        assert!((evolved.compliance_history - 0.92).abs() < 1e-9);
        assert!((evolved.risk_exposure - 0.19).abs() < 1e-9);
    }

    #[test]
    fn test_reliability_saturates_at_three_actions() {
        let now = Utc::now();
        let mut current = metrics_updated_at(now);
        current.reliability = 0.5;

        let two = vec![ActionOutcome::success(); 2];
        let evolved = evolve_metrics(&current, &two, now, &EvolutionConfig::default());
        // evidence 2/3 blended upward at 0.65
        assert!((evolved.reliability - (0.65 * (2.0 / 3.0) + 0.35 * 0.5)).abs() < 1e-9);

        let five = vec![ActionOutcome::success(); 5];
        let evolved = evolve_metrics(&current, &five, now, &EvolutionConfig::default());
        assert!((evolved.reliability - (0.65 * 1.0 + 0.35 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_action_defaults() {
        let success = ActionOutcome::success();
        assert_eq!(success.quality_or_default(), 0.95);
        assert_eq!(success.cooperation_or_default(), 0.9);

        let failure = ActionOutcome::failure();
        assert_eq!(failure.quality_or_default(), 0.2);
        assert_eq!(failure.cooperation_or_default(), 0.5);
    }
}
