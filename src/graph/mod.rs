// graph/mod.rs - Trust Graph Module

//! Relationship graph and analytics over the activity ledger.
//!
//! Provides:
//! - **Builder**: incremental graph construction from ledger entries
//! - **Analytics**: central nodes, high-impact contributors, risk
//!   clusters, delegation chains, systemic risk
//! - **Synergy**: pairwise forecasting, hidden synergies, opportunity
//!   discovery

mod analytics;
mod builder;
mod synergy;

pub use builder::{
    pair_key, Degrees, EdgeKind, GraphBuilder, GraphEdge, GraphNode, GraphSummary,
    NodePerformance, TrustGraph, DEFAULT_NODE_TRUST,
};

pub use analytics::{
    central_nodes, delegation_chains, high_impact_contributors, risk_clusters, systemic_risk,
    CentralNode, ImpactNode, RiskCluster, SystemicRiskReport, Vulnerability,
};

pub use synergy::{
    discover_opportunities, forecast_synergy, hidden_synergies, CollaborationProposal,
    Recommendation, SynergyForecast,
};
