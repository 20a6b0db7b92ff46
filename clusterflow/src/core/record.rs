//! Per-stage records and deployment state.

use super::{DeploymentPhase, StageId, StageStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the orchestrator knows about one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage this record belongs to.
    pub stage_id: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Free-form detail or error text from the last message.
    pub last_message: String,
    /// Wall-clock run time, set once the stage reports back.
    pub duration_ms: Option<f64>,
    /// When the record last changed (ISO 8601).
    pub updated_at: String,
}

impl StageRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn pending(stage_id: StageId) -> Self {
        Self {
            stage_id,
            status: StageStatus::Pending,
            last_message: String::new(),
            duration_ms: None,
            updated_at: crate::utils::iso_timestamp(),
        }
    }

    /// Moves the record to a new status with a message.
    pub fn transition(&mut self, status: StageStatus, message: impl Into<String>) {
        self.status = status;
        self.last_message = message.into();
        self.updated_at = crate::utils::iso_timestamp();
    }
}

/// Phase and cursor of one deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeploymentState {
    /// Overall phase.
    pub phase: DeploymentPhase,
    /// Index of the running stage; equals the plan length once completed.
    pub current_index: usize,
}

/// A point-in-time copy of the orchestrator's state.
///
/// Readers only ever see whole snapshots; the orchestrator publishes a new
/// one after each transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    /// Correlation id of the deployment run.
    pub run_id: Uuid,
    /// Phase and cursor.
    pub state: DeploymentState,
    /// One record per plan entry, in plan order.
    pub records: Vec<StageRecord>,
}

impl DeploymentSnapshot {
    /// Returns the record for a stage.
    #[must_use]
    pub fn record(&self, stage_id: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage_id.as_str() == stage_id)
    }

    /// Returns the status of a stage.
    #[must_use]
    pub fn status_of(&self, stage_id: &str) -> Option<StageStatus> {
        self.record(stage_id).map(|r| r.status)
    }

    /// Returns true once the phase is terminal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.phase.is_terminal()
    }
}
