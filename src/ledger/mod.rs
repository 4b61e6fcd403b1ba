// ledger/mod.rs - Activity Ledger Module

//! Append-only, hash-chained, per-entry-signed activity log.
//!
//! Provides:
//! - Frozen entries hashed over a canonical serialization
//! - Local or registry-routed signature verification on append
//! - Chain verification reporting the first offending index
//! - JSON file persistence that round-trips byte-identically

mod chain;
mod entry;

pub use chain::{
    ActivityLedger, AppendRequest, ChainFault, ChainVerdict, LedgerError, LedgerStats,
    DEFAULT_LEDGER_ORIGIN,
};

pub use entry::{action_types, compute_entry_hash, LedgerEntry};
