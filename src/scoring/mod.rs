// scoring/mod.rs - Trust Scoring Module

//! Trust scoring and reputation evolution.
//!
//! Both halves are pure functions over performance snapshots:
//!
//! - **Engine**: metrics -> six dimensions + context projections + composite
//! - **Evolution**: (metrics, recent actions, elapsed time) -> new metrics
//!
//! The registry and platform hub own the state; nothing in this module
//! does I/O.

mod engine;
mod evolution;

pub use engine::{
    score_metrics, ContextScores, ScoreMetadata, TrustContext, TrustDimensions, TrustProfile,
    SCORING_ENGINE_VERSION,
};

pub use evolution::{evolve_metrics, ActionOutcome, EvolutionConfig};
