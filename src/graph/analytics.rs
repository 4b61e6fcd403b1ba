// graph/analytics.rs - Structural Graph Analytics

//! Centrality, impact, risk-cluster and delegation-chain analytics over a
//! trust graph snapshot. Everything here is read-only and deterministic:
//! ties are broken by agent id so repeated runs agree.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::builder::{EdgeKind, TrustGraph};

/// Centrality threshold above which a node counts as critical
const CRITICAL_CENTRALITY: f64 = 20.0;

/// Trust score below which a node is risk-clustered
const RISKY_TRUST_THRESHOLD: f64 = 0.4;

/// A node ranked by structural centrality
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralNode {
    pub agent_id: String,
    pub centrality_index: f64,
    pub in_degree: u32,
    pub out_degree: u32,
    pub collaboration_frequency: u32,
}

/// Nodes ranked by `1.5*in + out + 2*collabFrequency`, descending
pub fn central_nodes(graph: &TrustGraph) -> Vec<CentralNode> {
    let mut ranked: Vec<CentralNode> = graph
        .nodes()
        .map(|node| {
            let collaboration_frequency = graph.collaboration_frequency(&node.agent_id);
            CentralNode {
                agent_id: node.agent_id.clone(),
                centrality_index: 1.5 * f64::from(node.connections.inbound)
                    + f64::from(node.connections.outbound)
                    + 2.0 * f64::from(collaboration_frequency),
                in_degree: node.connections.inbound,
                out_degree: node.connections.outbound,
                collaboration_frequency,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.centrality_index
            .partial_cmp(&a.centrality_index)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    ranked
}

/// A node ranked by economic and collaborative impact
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactNode {
    pub agent_id: String,
    pub impact_score: f64,
    pub success_rate: f64,
    pub pnl: f64,
    pub economic_count: u32,
}

/// Success share of the collaboration edges touching a node; 1.0 when none
fn node_success_rate(graph: &TrustGraph, agent_id: &str) -> f64 {
    let mut total = 0u32;
    let mut successes = 0u32;
    for edge in graph.collaboration_edges_touching(agent_id) {
        total += 1;
        if edge.is_success() {
            successes += 1;
        }
    }
    if total == 0 {
        1.0
    } else {
        f64::from(successes) / f64::from(total)
    }
}

/// Nodes ranked by `0.1*pnl + 100*successRate + 5*count`, descending
pub fn high_impact_contributors(graph: &TrustGraph) -> Vec<ImpactNode> {
    let mut ranked: Vec<ImpactNode> = graph
        .nodes()
        .map(|node| {
            let success_rate = node_success_rate(graph, &node.agent_id);
            ImpactNode {
                agent_id: node.agent_id.clone(),
                impact_score: 0.1 * node.performance.pnl
                    + 100.0 * success_rate
                    + 5.0 * f64::from(node.performance.count),
                success_rate,
                pnl: node.performance.pnl,
                economic_count: node.performance.count,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    ranked
}

/// A connected component of risky nodes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCluster {
    pub members: Vec<String>,
    pub risk_level: f64,
    pub average_trust: f64,
    pub total_violations: u32,
}

/// Connected components over nodes with low trust or recorded violations.
///
/// `riskLevel = (1 - avgTrust) * size + 2 * totalViolations`.
pub fn risk_clusters(graph: &TrustGraph) -> Vec<RiskCluster> {
    let risky: BTreeSet<&str> = graph
        .nodes()
        .filter(|n| n.trust_score < RISKY_TRUST_THRESHOLD || n.performance.violations > 0)
        .map(|n| n.agent_id.as_str())
        .collect();

    // Undirected adjacency restricted to risky nodes
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in graph.edges() {
        let (from, to) = (edge.from.as_str(), edge.to.as_str());
        if risky.contains(from) && risky.contains(to) {
            adjacency.entry(from).or_default().insert(to);
            adjacency.entry(to).or_default().insert(from);
        }
    }

    let mut clusters = Vec::new();
    let mut visited: BTreeSet<&str> = BTreeSet::new();

    for seed in &risky {
        if visited.contains(seed) {
            continue;
        }

        let mut members = Vec::new();
        let mut queue = VecDeque::from([*seed]);
        visited.insert(*seed);
        while let Some(current) = queue.pop_front() {
            members.push(current.to_string());
            if let Some(neighbors) = adjacency.get(current) {
                for &neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        members.sort();

        let size = members.len() as f64;
        let average_trust = members
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|n| n.trust_score)
            .sum::<f64>()
            / size;
        let total_violations: u32 = members
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|n| n.performance.violations)
            .sum();

        clusters.push(RiskCluster {
            members,
            risk_level: (1.0 - average_trust) * size + 2.0 * f64::from(total_violations),
            average_trust,
            total_violations,
        });
    }

    clusters.sort_by(|a, b| {
        b.risk_level
            .partial_cmp(&a.risk_level)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.members.cmp(&b.members))
    });
    clusters
}

/// Delegation chains from root delegators, cycles marked with `(LOOP)`
pub fn delegation_chains(graph: &TrustGraph) -> Vec<Vec<String>> {
    // Delegation-only adjacency and degrees
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut delegation_in: HashMap<&str, u32> = HashMap::new();
    for edge in graph.edges() {
        if edge.kind == EdgeKind::Delegation {
            outgoing.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
            *delegation_in.entry(edge.to.as_str()).or_insert(0) += 1;
        }
    }
    for targets in outgoing.values_mut() {
        targets.sort_unstable();
        targets.dedup();
    }

    let mut chains = Vec::new();
    for (&seed, _) in outgoing
        .iter()
        .filter(|(id, _)| delegation_in.get(**id).copied().unwrap_or(0) == 0)
    {
        let mut path = vec![seed.to_string()];
        walk_delegations(seed, &outgoing, &mut path, &mut chains);
    }
    chains
}

fn walk_delegations(
    current: &str,
    outgoing: &BTreeMap<&str, Vec<&str>>,
    path: &mut Vec<String>,
    chains: &mut Vec<Vec<String>>,
) {
    let targets = match outgoing.get(current) {
        Some(targets) if !targets.is_empty() => targets,
        _ => {
            chains.push(path.clone());
            return;
        }
    };

    for &target in targets {
        if path.iter().any(|hop| hop == target) {
            let mut looped = path.clone();
            looped.push(format!("{target} (LOOP)"));
            chains.push(looped);
            continue;
        }
        path.push(target.to_string());
        walk_delegations(target, outgoing, path, chains);
        path.pop();
    }
}

/// A highly central, low-trust node
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub agent_id: String,
    pub centrality_index: f64,
    pub trust_score: f64,
    pub vulnerability_score: f64,
}

/// System-wide risk summary
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemicRiskReport {
    pub global_risk_index: f64,
    pub critical_vulnerabilities: Vec<Vulnerability>,
    pub risk_clusters: usize,
}

/// Aggregate systemic risk: total cluster risk normalized by population,
/// plus the top-3 critical vulnerabilities
pub fn systemic_risk(graph: &TrustGraph) -> SystemicRiskReport {
    let clusters = risk_clusters(graph);
    let node_count = graph.nodes().count();
    let global_risk_index = if node_count == 0 {
        0.0
    } else {
        clusters.iter().map(|c| c.risk_level).sum::<f64>() / node_count as f64
    };

    let mut critical: Vec<Vulnerability> = central_nodes(graph)
        .into_iter()
        .filter(|c| c.centrality_index > CRITICAL_CENTRALITY)
        .filter_map(|c| {
            graph.node(&c.agent_id).map(|node| Vulnerability {
                agent_id: c.agent_id,
                centrality_index: c.centrality_index,
                trust_score: node.trust_score,
                vulnerability_score: c.centrality_index / 100.0 * (1.0 - node.trust_score),
            })
        })
        .collect();
    critical.sort_by(|a, b| {
        b.vulnerability_score
            .partial_cmp(&a.vulnerability_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    critical.truncate(3);

    SystemicRiskReport {
        global_risk_index,
        critical_vulnerabilities: critical,
        risk_clusters: clusters.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_support::test_keypair;
    use crate::ledger::{ActivityLedger, AppendRequest};
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

    #[test]
    fn test_central_nodes_ranking() {
        let graph = build_graph(vec![
            ("hub", "NEGOTIATION", json!({"counterparty": "x"})),
            ("hub", "NEGOTIATION", json!({"counterparty": "y"})),
            ("x", "DELEGATION", json!({"delegatedTo": "hub"})),
            ("lone", "ECONOMIC", json!({"revenue": 1.0})),
        ]);

        let ranked = central_nodes(&graph);
        assert_eq!(ranked[0].agent_id, "hub");
        // hub: in 1, out 2, collab 2 -> 1.5 + 2 + 4
        assert_eq!(ranked[0].centrality_index, 7.5);
        assert_eq!(ranked.last().unwrap().centrality_index, 0.0);
    }

    #[test]
    fn test_high_impact_contributors() {
        let graph = build_graph(vec![
            ("earner", "ECONOMIC", json!({"revenue": 500.0, "pnl": 200.0})),
            ("earner", "NEGOTIATION", json!({"counterparty": "peer", "outcome": "SUCCESS"})),
            ("peer", "NEGOTIATION", json!({"counterparty": "earner", "outcome": "FAILURE"})),
        ]);

        let ranked = high_impact_contributors(&graph);
        assert_eq!(ranked[0].agent_id, "earner");
        // pnl 200, success 1/2, count 1 -> 20 + 50 + 5
        assert_eq!(ranked[0].impact_score, 75.0);
        assert_eq!(ranked[0].success_rate, 0.5);

        // peer has no economic entries; default success applies to its two edges
        let peer = ranked.iter().find(|n| n.agent_id == "peer").unwrap();
        assert_eq!(peer.pnl, 0.0);
        assert_eq!(peer.success_rate, 0.5);
    }

    #[test]
    fn test_risk_clusters() {
        // Violators a and b are linked; c violates alone; clean d is linked
        // to a but is not risky.
        let mut graph = build_graph(vec![
            ("a", "POLICY_VIOLATION", json!({})),
            ("b", "POLICY_VIOLATION", json!({})),
            ("c", "POLICY_VIOLATION", json!({})),
            ("a", "NEGOTIATION", json!({"counterparty": "b"})),
            ("a", "NEGOTIATION", json!({"counterparty": "d"})),
        ]);
        for node in graph.nodes.values_mut() {
            node.trust_score = 0.6; // risky only through violations
        }

        let clusters = risk_clusters(&graph);
        assert_eq!(clusters.len(), 2);

        let big = &clusters[0];
        assert_eq!(big.members, vec!["a", "b"]);
        assert_eq!(big.total_violations, 2);
        // (1 - 0.6) * 2 + 2 * 2
        assert!((big.risk_level - 4.8).abs() < 1e-9);

        let small = &clusters[1];
        assert_eq!(small.members, vec!["c"]);
        assert!((small.risk_level - (0.4 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_low_trust_alone_is_risky() {
        let mut graph = build_graph(vec![("quiet", "ECONOMIC", json!({"revenue": 1.0}))]);
        graph.nodes.get_mut("quiet").unwrap().trust_score = 0.2;

        let clusters = risk_clusters(&graph);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec!["quiet"]);
    }

    #[test]
    fn test_delegation_chains() {
        let graph = build_graph(vec![
            ("root", "DELEGATION", json!({"delegatedTo": "mid"})),
            ("mid", "DELEGATION", json!({"delegatedTo": "leaf"})),
            ("root", "DELEGATION", json!({"delegatedTo": "leaf"})),
        ]);

        let mut chains = delegation_chains(&graph);
        chains.sort();
        assert_eq!(
            chains,
            vec![
                vec!["root".to_string(), "leaf".to_string()],
                vec!["root".to_string(), "mid".to_string(), "leaf".to_string()],
            ]
        );
    }

    #[test]
    fn test_delegation_cycle_is_marked() {
        let graph = build_graph(vec![
            ("root", "DELEGATION", json!({"delegatedTo": "a"})),
            ("a", "DELEGATION", json!({"delegatedTo": "b"})),
            ("b", "DELEGATION", json!({"delegatedTo": "a"})),
        ]);

        let chains = delegation_chains(&graph);
        assert_eq!(chains.len(), 1);
        assert_eq!(
            chains[0],
            vec![
                "root".to_string(),
                "a".to_string(),
                "b".to_string(),
                "a (LOOP)".to_string()
            ]
        );
    }

    #[test]
    fn test_systemic_risk_report() {
        let mut graph = build_graph(vec![
            ("hub", "NEGOTIATION", json!({"counterparty": "x"})),
            ("x", "POLICY_VIOLATION", json!({})),
        ]);
        // Make the hub highly central and poorly trusted
        for _ in 0..12 {
            let node = graph.nodes.get_mut("hub").unwrap();
            node.connections.inbound += 1;
            node.connections.outbound += 1;
        }
        graph.nodes.get_mut("hub").unwrap().trust_score = 0.3;

        let report = systemic_risk(&graph);
        assert!(report.global_risk_index > 0.0);
        // hub (low trust) and x (violation) share an edge: one cluster
        assert_eq!(report.risk_clusters, 1);
        assert_eq!(report.critical_vulnerabilities.len(), 1);

        let vuln = &report.critical_vulnerabilities[0];
        assert_eq!(vuln.agent_id, "hub");
        assert!(vuln.centrality_index > 20.0);
        assert!(
            (vuln.vulnerability_score - vuln.centrality_index / 100.0 * 0.7).abs() < 1e-9
        );
    }

    #[test]
    fn test_empty_graph_systemic_risk() {
        let graph = TrustGraph::default();
        let report = systemic_risk(&graph);

        assert_eq!(report.global_risk_index, 0.0);
        assert_eq!(report.risk_clusters, 0);
        assert!(report.critical_vulnerabilities.is_empty());
    }
}
