//! Stage status and deployment phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The orchestrator's view of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Stage has not been started yet.
    #[default]
    Pending,
    /// Stage was sent `START` and has not reported back.
    Running,
    /// Stage reported `STAGE_COMPLETE`.
    Succeeded,
    /// Stage reported `STAGE_FAILED`.
    Failed,
    /// Stage acknowledged an abort after a sibling failed.
    Aborted,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl StageStatus {
    /// Returns true if the stage will not change status again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }

    /// Returns true if the stage should still receive an abort on failure.
    #[must_use]
    pub fn is_abortable(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// The overall phase of one deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentPhase {
    /// Waiting for the readiness trigger.
    #[default]
    NotStarted,
    /// Stages are being driven in order.
    Running,
    /// A stage failed; terminal.
    Failed,
    /// Every stage succeeded; terminal.
    Completed,
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Failed => write!(f, "FAILED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl DeploymentPhase {
    /// Returns true for `Failed` and `Completed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}
