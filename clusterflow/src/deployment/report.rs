//! Final outcome of one deployment run.

use crate::core::{DeploymentPhase, DeploymentSnapshot, StageRecord, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// What a finished deployment looked like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// Terminal phase, or `NOT_STARTED` if the run was never triggered.
    pub phase: DeploymentPhase,
    /// Final per-stage records in plan order.
    pub records: Vec<StageRecord>,
    /// Wall-clock time from launch to the last actor exiting.
    pub duration_ms: f64,
}

impl DeploymentReport {
    /// Builds a report from the orchestrator's last snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: DeploymentSnapshot, duration_ms: f64) -> Self {
        Self {
            run_id: snapshot.run_id,
            phase: snapshot.state.phase,
            records: snapshot.records,
            duration_ms,
        }
    }

    /// True if every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.phase == DeploymentPhase::Completed
    }

    /// The stage that failed the run, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.status == StageStatus::Failed)
    }

    /// Status of every stage keyed by id.
    #[must_use]
    pub fn stage_summary(&self) -> BTreeMap<String, StageStatus> {
        self.records
            .iter()
            .map(|r| (r.stage_id.to_string(), r.status))
            .collect()
    }
}
