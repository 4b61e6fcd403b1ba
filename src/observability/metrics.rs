// observability/metrics.rs - Substrate Metrics

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register metric descriptions with the installed recorder.
///
/// Exporter choice belongs to the embedding host; the substrate only
/// emits through the `metrics` facade.
pub fn describe_metrics() {
    describe_counter!(
        "trustmesh_identities_registered_total",
        "Identities registered"
    );
    describe_counter!("trustmesh_identities_revoked_total", "Identities revoked");
    describe_counter!(
        "trustmesh_actions_validated_total",
        "Signed actions accepted"
    );
    describe_counter!(
        "trustmesh_actions_rejected_total",
        "Signed actions rejected, labeled by reason"
    );
    describe_counter!("trustmesh_ledger_entries_total", "Ledger entries appended");
    describe_counter!(
        "trustmesh_proposals_rejected_total",
        "Proposals rejected by the validator"
    );
    describe_gauge!("trustmesh_trust_score", "Latest composite per agent");
}

pub fn record_identity_registered() {
    counter!("trustmesh_identities_registered_total").increment(1);
}

pub fn record_identity_revoked() {
    counter!("trustmesh_identities_revoked_total").increment(1);
}

pub fn record_action_validated() {
    counter!("trustmesh_actions_validated_total").increment(1);
}

pub fn record_action_rejected(reason: &'static str) {
    counter!("trustmesh_actions_rejected_total", "reason" => reason).increment(1);
}

pub fn record_ledger_append() {
    counter!("trustmesh_ledger_entries_total").increment(1);
}

pub fn record_proposal_rejected() {
    counter!("trustmesh_proposals_rejected_total").increment(1);
}

pub fn record_trust_score(agent_id: &str, composite: f64) {
    gauge!("trustmesh_trust_score", "agent" => agent_id.to_string()).set(composite);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        // The facade drops events when no recorder is installed
        describe_metrics();
        record_identity_registered();
        record_action_rejected("REPLAY_DETECTED");
        record_trust_score("did:agent:x", 0.9);
    }
}
