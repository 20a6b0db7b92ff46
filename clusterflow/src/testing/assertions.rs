//! Assertions over deployment snapshots.

use crate::core::{DeploymentPhase, DeploymentSnapshot, StageStatus};

/// Asserts the phase of a snapshot.
pub fn assert_phase(snapshot: &DeploymentSnapshot, expected: DeploymentPhase) {
    assert_eq!(
        snapshot.state.phase, expected,
        "Expected phase {expected}, got {} (records: {:?})",
        snapshot.state.phase,
        snapshot.records.iter().map(|r| (r.stage_id.as_str(), r.status)).collect::<Vec<_>>()
    );
}

/// Asserts the status of one stage.
pub fn assert_stage_status(snapshot: &DeploymentSnapshot, stage: &str, expected: StageStatus) {
    let actual = snapshot.status_of(stage);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{stage}' to be {expected}, got {actual:?}"
    );
}

/// Asserts the status of every stage, in plan order.
pub fn assert_stage_statuses(snapshot: &DeploymentSnapshot, expected: &[StageStatus]) {
    let actual: Vec<StageStatus> = snapshot.records.iter().map(|r| r.status).collect();
    assert_eq!(actual, expected, "Stage statuses differ");
}
