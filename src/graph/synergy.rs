// graph/synergy.rs - Predictive Synergy

//! Pairwise synergy forecasting over the trust graph.
//!
//! Forecasts combine collaboration history (the COLLABORATION edges
//! between the pair) with profile compatibility. Pairs with no history
//! fall back to priors: a 0.8 success rate and low confidence.

use serde::{Deserialize, Serialize};

use super::builder::TrustGraph;

/// Success-rate prior for pairs with no collaboration history
const BASELINE_SUCCESS_RATE: f64 = 0.8;

/// Cooperation assumed for agents without a trust profile
const DEFAULT_COMPATIBILITY: f64 = 0.5;

/// Probability threshold for surfacing a hidden synergy
const HIDDEN_SYNERGY_THRESHOLD: f64 = 0.75;

/// Forecast recommendation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    PromoteCollaboration,
    MonitoredCooperation,
}

/// Synergy forecast for an agent pair
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynergyForecast {
    pub agent_a: String,
    pub agent_b: String,
    pub historical_collaborations: u32,
    pub success_rate: f64,
    pub compatibility: f64,
    pub synergy_probability: f64,
    pub predicted_economic_surplus: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
}

fn node_cooperation(graph: &TrustGraph, agent_id: &str) -> f64 {
    graph
        .node(agent_id)
        .and_then(|n| n.trust_profile.as_ref())
        .map(|p| p.dimensions.cooperation)
        .unwrap_or(DEFAULT_COMPATIBILITY)
}

fn surplus_boost(historical: u32) -> f64 {
    match historical {
        0 => 1.0,
        1..=4 => 1.1,
        _ => 1.25,
    }
}

/// Forecast the synergy of a pair working together
pub fn forecast_synergy(graph: &TrustGraph, agent_a: &str, agent_b: &str) -> SynergyForecast {
    let historical = graph.collaboration_count(agent_a, agent_b);

    let success_rate = {
        let mut total = 0u32;
        let mut successes = 0u32;
        for edge in graph.collaboration_edges_between(agent_a, agent_b) {
            total += 1;
            if edge.is_success() {
                successes += 1;
            }
        }
        if total == 0 {
            BASELINE_SUCCESS_RATE
        } else {
            f64::from(successes) / f64::from(total)
        }
    };

    let compatibility =
        (node_cooperation(graph, agent_a) + node_cooperation(graph, agent_b)) / 2.0;
    let synergy_probability = 0.6 * success_rate + 0.4 * compatibility;

    let avg_pnl_a = graph.node(agent_a).map_or(0.0, |n| n.average_pnl());
    let avg_pnl_b = graph.node(agent_b).map_or(0.0, |n| n.average_pnl());
    let predicted_economic_surplus = (avg_pnl_a + avg_pnl_b) * surplus_boost(historical);

    let confidence = if historical == 0 {
        0.4
    } else {
        (0.5 + 0.1 * f64::from(historical)).min(0.95)
    };

    let recommendation = if success_rate * compatibility > 0.6 {
        Recommendation::PromoteCollaboration
    } else {
        Recommendation::MonitoredCooperation
    };

    SynergyForecast {
        agent_a: agent_a.to_string(),
        agent_b: agent_b.to_string(),
        historical_collaborations: historical,
        success_rate,
        compatibility,
        synergy_probability,
        predicted_economic_surplus,
        confidence,
        recommendation,
    }
}

/// Never-collaborated pairs whose forecast clears the hidden-synergy
/// threshold, best first, at most `top_k`
pub fn hidden_synergies(graph: &TrustGraph, top_k: usize) -> Vec<SynergyForecast> {
    let mut ids: Vec<&str> = graph.nodes().map(|n| n.agent_id.as_str()).collect();
    ids.sort_unstable();

    let mut found = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            if graph.collaboration_count(a, b) > 0 {
                continue;
            }
            let forecast = forecast_synergy(graph, a, b);
            if forecast.synergy_probability > HIDDEN_SYNERGY_THRESHOLD {
                found.push(forecast);
            }
        }
    }

    found.sort_by(|a, b| {
        b.synergy_probability
            .partial_cmp(&a.synergy_probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.agent_a.as_str(), a.agent_b.as_str()).cmp(&(b.agent_a.as_str(), b.agent_b.as_str())))
    });
    found.truncate(top_k);
    found
}

/// A collaboration proposal surfaced from hidden synergies
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationProposal {
    pub agents: (String, String),
    pub synergy_probability: f64,
    pub predicted_economic_surplus: f64,
    pub confidence: f64,
    pub rationale: String,
}

/// Turn the best hidden synergies into actionable proposals
pub fn discover_opportunities(graph: &TrustGraph, limit: usize) -> Vec<CollaborationProposal> {
    hidden_synergies(graph, limit)
        .into_iter()
        .map(|forecast| CollaborationProposal {
            rationale: format!(
                "{} and {} have never collaborated; forecast probability {:.2} on compatibility {:.2}",
                forecast.agent_a,
                forecast.agent_b,
                forecast.synergy_probability,
                forecast.compatibility
            ),
            agents: (forecast.agent_a, forecast.agent_b),
            synergy_probability: forecast.synergy_probability,
            predicted_economic_surplus: forecast.predicted_economic_surplus,
            confidence: forecast.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_support::test_keypair;
    use crate::identity::PerformanceMetrics;
    use crate::ledger::{ActivityLedger, AppendRequest};
    use crate::scoring::score_metrics;
    use serde_json::{json, Value};

    fn build_graph(entries: Vec<(&str, &str, Value)>) -> TrustGraph {
        let keypair = test_keypair(0);
        let mut ledger = ActivityLedger::new();
        for (agent, action, details) in entries {
            ledger
                .add_entry(AppendRequest {
                    agent_id: agent.into(),
                    action_type: action.into(),
                    details,
                    public_key: keypair.public_key_pem.clone(),
                    private_key: Some(keypair.private_key_pem.clone()),
                    ..Default::default()
                })
                .unwrap();
        }
        TrustGraph::from_ledger(&ledger)
    }

    /// Stamp a node with a profile whose cooperation dimension is `coop`
    fn set_cooperation(graph: &mut TrustGraph, agent_id: &str, coop: f64) {
        let metrics = PerformanceMetrics {
            cooperation_score: coop,
            information_sharing_score: Some(coop),
            ..Default::default()
        };
        let profile = score_metrics(&metrics, None);
        let node = graph.nodes.get_mut(agent_id).unwrap();
        node.trust_score = profile.composite;
        node.trust_profile = Some(profile);
    }

    #[test]
    fn test_fresh_pair_forecast() {
        let mut graph = build_graph(vec![
            ("a", "ECONOMIC", json!({"revenue": 10.0})),
            ("b", "ECONOMIC", json!({"revenue": 10.0})),
        ]);
        set_cooperation(&mut graph, "a", 0.9);
        set_cooperation(&mut graph, "b", 0.9);

        let forecast = forecast_synergy(&graph, "a", "b");

        assert_eq!(forecast.historical_collaborations, 0);
        assert_eq!(forecast.success_rate, 0.8);
        assert!((forecast.compatibility - 0.9).abs() < 1e-9);
        assert!((forecast.synergy_probability - 0.84).abs() < 1e-9);
        assert_eq!(forecast.confidence, 0.4);
        // 0.8 * 0.9 = 0.72 > 0.6
        assert_eq!(forecast.recommendation, Recommendation::PromoteCollaboration);
    }

    #[test]
    fn test_history_overrides_prior() {
        let mut graph = build_graph(vec![
            ("a", "NEGOTIATION", json!({"counterparty": "b", "outcome": "SUCCESS"})),
            ("a", "NEGOTIATION", json!({"counterparty": "b", "outcome": "FAILURE"})),
            ("b", "NEGOTIATION", json!({"counterparty": "a", "outcome": "FAILURE"})),
        ]);
        set_cooperation(&mut graph, "a", 0.6);
        set_cooperation(&mut graph, "b", 0.6);

        let forecast = forecast_synergy(&graph, "a", "b");

        assert_eq!(forecast.historical_collaborations, 3);
        assert!((forecast.success_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((forecast.confidence - 0.8).abs() < 1e-9);
        // 1/3 * 0.6 = 0.2 < 0.6
        assert_eq!(forecast.recommendation, Recommendation::MonitoredCooperation);
    }

    #[test]
    fn test_surplus_boost_tiers() {
        assert_eq!(surplus_boost(0), 1.0);
        assert_eq!(surplus_boost(1), 1.1);
        assert_eq!(surplus_boost(4), 1.1);
        assert_eq!(surplus_boost(5), 1.25);
        assert_eq!(surplus_boost(50), 1.25);
    }

    #[test]
    fn test_predicted_surplus_uses_average_pnl() {
        let mut graph = build_graph(vec![
            ("a", "ECONOMIC", json!({"pnl": 100.0})),
            ("a", "ECONOMIC", json!({"pnl": 50.0})),
            ("b", "ECONOMIC", json!({"pnl": 30.0})),
            ("a", "NEGOTIATION", json!({"counterparty": "b", "outcome": "SUCCESS"})),
        ]);
        set_cooperation(&mut graph, "a", 0.9);
        set_cooperation(&mut graph, "b", 0.9);

        let forecast = forecast_synergy(&graph, "a", "b");
        // (75 + 30) * 1.1 for one historical collaboration
        assert!((forecast.predicted_economic_surplus - 105.0 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_saturates() {
        let mut entries = Vec::new();
        for _ in 0..6 {
            entries.push(("a", "NEGOTIATION", json!({"counterparty": "b", "outcome": "SUCCESS"})));
        }
        let graph = build_graph(entries);

        let forecast = forecast_synergy(&graph, "a", "b");
        assert_eq!(forecast.historical_collaborations, 6);
        assert!((forecast.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_hidden_synergies_excludes_collaborators() {
        let mut graph = build_graph(vec![
            ("a", "NEGOTIATION", json!({"counterparty": "b", "outcome": "SUCCESS"})),
            ("c", "ECONOMIC", json!({"revenue": 5.0})),
        ]);
        for id in ["a", "b", "c"] {
            set_cooperation(&mut graph, id, 0.95);
        }

        let hidden = hidden_synergies(&graph, 10);
        let pairs: Vec<(&str, &str)> = hidden
            .iter()
            .map(|f| (f.agent_a.as_str(), f.agent_b.as_str()))
            .collect();

        // a<->b already collaborate; only the never-matched pairs surface
        assert!(pairs.contains(&("a", "c")));
        assert!(pairs.contains(&("b", "c")));
        assert!(!pairs.contains(&("a", "b")));

        // prior 0.8 * 0.6 + 0.95-ish compat * 0.4 clears 0.75
        for forecast in &hidden {
            assert!(forecast.synergy_probability > 0.75);
            assert_eq!(forecast.historical_collaborations, 0);
        }
    }

    #[test]
    fn test_hidden_synergies_threshold() {
        let mut graph = build_graph(vec![
            ("a", "ECONOMIC", json!({"revenue": 1.0})),
            ("b", "ECONOMIC", json!({"revenue": 1.0})),
        ]);
        // Low compatibility: 0.6*0.8 + 0.4*0.5 = 0.68 < 0.75
        set_cooperation(&mut graph, "a", 0.5);
        set_cooperation(&mut graph, "b", 0.5);

        assert!(hidden_synergies(&graph, 10).is_empty());
    }

    #[test]
    fn test_discover_opportunities_shape() {
        let mut graph = build_graph(vec![
            ("a", "ECONOMIC", json!({"pnl": 10.0})),
            ("b", "ECONOMIC", json!({"pnl": 20.0})),
        ]);
        set_cooperation(&mut graph, "a", 0.95);
        set_cooperation(&mut graph, "b", 0.95);

        let proposals = discover_opportunities(&graph, 5);
        assert_eq!(proposals.len(), 1);

        let proposal = &proposals[0];
        assert_eq!(proposal.agents, ("a".to_string(), "b".to_string()));
        assert!((proposal.predicted_economic_surplus - 30.0).abs() < 1e-9);
        assert!(proposal.rationale.contains("never collaborated"));
    }
}
