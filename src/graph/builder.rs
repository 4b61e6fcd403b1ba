// graph/builder.rs - Trust Graph Construction

//! Relationship graph derived from the activity ledger.
//!
//! Nodes are keyed by agent id; edges are typed DELEGATION or
//! COLLABORATION. The builder ingests entries one at a time in index
//! order, so feeding it a live ledger incrementally yields exactly the
//! graph a full rebuild would.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::IdentityRegistry;
use crate::ledger::{action_types, ActivityLedger, LedgerEntry};
use crate::scoring::TrustProfile;

/// Trust score assumed for agents with no registered profile
pub const DEFAULT_NODE_TRUST: f64 = 0.5;

/// Edge types in the trust graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Delegation,
    Collaboration,
}

/// A directed edge between two agents
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,

    /// Collaboration flavor (NEGOTIATION, COOPERATION)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Outcome tag carried from the entry details (e.g. SUCCESS)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl GraphEdge {
    /// Whether this edge records a successful outcome
    pub fn is_success(&self) -> bool {
        self.outcome.as_deref() == Some("SUCCESS")
    }
}

/// Directed degree counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degrees {
    #[serde(rename = "in")]
    pub inbound: u32,
    #[serde(rename = "out")]
    pub outbound: u32,
}

/// Per-node economic and conduct aggregates
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePerformance {
    pub revenue: f64,
    pub pnl: f64,
    pub violations: u32,

    /// Number of economic entries aggregated
    pub count: u32,
}

/// One agent in the trust graph
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub agent_id: String,
    pub trust_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_profile: Option<TrustProfile>,
    pub performance: NodePerformance,
    pub connections: Degrees,
}

impl GraphNode {
    fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            trust_score: DEFAULT_NODE_TRUST,
            trust_profile: None,
            performance: NodePerformance::default(),
            connections: Degrees::default(),
        }
    }

    /// Mean profit per economic entry
    pub fn average_pnl(&self) -> f64 {
        if self.performance.count == 0 {
            0.0
        } else {
            self.performance.pnl / f64::from(self.performance.count)
        }
    }
}

/// Canonical key for an unordered agent pair
pub fn pair_key(a: &str, b: &str) -> String {
    let mut pair = [a, b];
    pair.sort_unstable();
    format!("{}<->{}", pair[0], pair[1])
}

/// Graph-level counters
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub delegation_edges: usize,
    pub collaboration_edges: usize,
}

/// The relationship graph over a ledger snapshot
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustGraph {
    pub(crate) nodes: HashMap<String, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,

    /// Undirected collaboration counts keyed by `pair_key`
    pub(crate) collaboration: HashMap<String, u32>,
}

impl TrustGraph {
    /// Build from a full ledger snapshot
    pub fn from_ledger(ledger: &ActivityLedger) -> Self {
        let mut builder = GraphBuilder::new();
        for entry in ledger.entries() {
            builder.ingest(entry);
        }
        builder.finish()
    }

    /// Build from a ledger and stamp trust scores from the registry
    pub fn from_ledger_with_registry(
        ledger: &ActivityLedger,
        registry: &IdentityRegistry,
    ) -> Self {
        let mut graph = Self::from_ledger(ledger);
        for node in graph.nodes.values_mut() {
            if let Some(record) = registry.get_by_id(&node.agent_id) {
                node.trust_score = record.trust_score;
                node.trust_profile = Some(record.trust_profile.clone());
            }
        }
        graph
    }

    pub fn node(&self, agent_id: &str) -> Option<&GraphNode> {
        self.nodes.get(agent_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Historical collaboration count between a pair
    pub fn collaboration_count(&self, a: &str, b: &str) -> u32 {
        self.collaboration.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    /// Collaboration edges between exactly this pair
    pub fn collaboration_edges_between<'a>(
        &'a self,
        a: &'a str,
        b: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| {
            e.kind == EdgeKind::Collaboration
                && ((e.from == a && e.to == b) || (e.from == b && e.to == a))
        })
    }

    /// Collaboration edges touching one agent
    pub fn collaboration_edges_touching<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges
            .iter()
            .filter(move |e| e.kind == EdgeKind::Collaboration && (e.from == agent_id || e.to == agent_id))
    }

    /// Total collaboration events an agent took part in
    pub fn collaboration_frequency(&self, agent_id: &str) -> u32 {
        self.collaboration
            .iter()
            .filter(|(key, _)| {
                key.split("<->").any(|part| part == agent_id)
            })
            .map(|(_, count)| count)
            .sum()
    }

    pub fn summary(&self) -> GraphSummary {
        let delegation_edges = self
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Delegation)
            .count();
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            delegation_edges,
            collaboration_edges: self.edges.len() - delegation_edges,
        }
    }
}

/// Incremental graph builder; feed entries in index order
#[derive(Default)]
pub struct GraphBuilder {
    graph: TrustGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, agent_id: &str) {
        self.graph
            .nodes
            .entry(agent_id.to_string())
            .or_insert_with(|| GraphNode::new(agent_id));
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind, tag: Option<&str>, outcome: Option<String>) {
        self.ensure_node(from);
        self.ensure_node(to);

        if let Some(node) = self.graph.nodes.get_mut(from) {
            node.connections.outbound += 1;
        }
        if let Some(node) = self.graph.nodes.get_mut(to) {
            node.connections.inbound += 1;
        }
        self.graph.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            tag: tag.map(str::to_string),
            outcome,
        });
    }

    fn count_collaboration(&mut self, a: &str, b: &str) {
        *self.graph.collaboration.entry(pair_key(a, b)).or_insert(0) += 1;
    }

    /// Fold one ledger entry into the graph
    pub fn ingest(&mut self, entry: &LedgerEntry) {
        let actor = entry.agent_id.as_str();
        self.ensure_node(actor);

        let details = &entry.details;
        let outcome = details
            .get("outcome")
            .and_then(Value::as_str)
            .map(str::to_string);

        match entry.action_type.as_str() {
            action_types::DELEGATION => {
                if let Some(delegate) = details.get("delegatedTo").and_then(Value::as_str) {
                    self.add_edge(actor, delegate, EdgeKind::Delegation, None, outcome);
                }
            }
            action_types::NEGOTIATION => {
                if let Some(counterparty) = details.get("counterparty").and_then(Value::as_str) {
                    self.add_edge(
                        actor,
                        counterparty,
                        EdgeKind::Collaboration,
                        Some(action_types::NEGOTIATION),
                        outcome,
                    );
                    self.count_collaboration(actor, counterparty);
                }
            }
            action_types::COOPERATION | action_types::COOPERATIVE_COLLABORATION => {
                let partners: Vec<String> = details
                    .get("partners")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                for partner in partners {
                    self.add_edge(
                        actor,
                        &partner,
                        EdgeKind::Collaboration,
                        Some(action_types::COOPERATION),
                        outcome.clone(),
                    );
                    self.count_collaboration(actor, &partner);
                }
            }
            action_types::ECONOMIC | action_types::ECONOMIC_OUTCOME => {
                let revenue = details.get("revenue").and_then(Value::as_f64).unwrap_or(0.0);
                let pnl = match details.get("pnl") {
                    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                    Some(Value::Object(map)) => map
                        .get("netProfit")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                    _ => 0.0,
                };
                if let Some(node) = self.graph.nodes.get_mut(actor) {
                    node.performance.revenue += revenue;
                    node.performance.pnl += pnl;
                    node.performance.count += 1;
                }
            }
            action_types::POLICY_VIOLATION => {
                if let Some(node) = self.graph.nodes.get_mut(actor) {
                    node.performance.violations += 1;
                }
            }
            // Unknown types still materialize the actor node
            _ => {}
        }
    }

    pub fn finish(self) -> TrustGraph {
        self.graph
    }
}
