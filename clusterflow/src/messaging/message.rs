//! Messages exchanged between the orchestrator and stage executors.

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorId {
    /// The deployment orchestrator.
    Orchestrator,
    /// The executor owning one stage.
    Stage(StageId),
}

impl ActorId {
    /// Returns the stage id if the actor is a stage executor.
    #[must_use]
    pub fn stage(&self) -> Option<&StageId> {
        match self {
            Self::Orchestrator => None,
            Self::Stage(id) => Some(id),
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orchestrator => write!(f, "orchestrator"),
            Self::Stage(id) => write!(f, "{id}"),
        }
    }
}

/// The protocol between the orchestrator and stage executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Orchestrator → executor: run your stage.
    Start,
    /// Orchestrator → executor: a sibling failed, do not run.
    Abort,
    /// Executor → orchestrator: the abort was seen.
    AbortAck,
    /// Executor → orchestrator: the stage succeeded.
    StageComplete {
        /// Redacted command output.
        detail: String,
    },
    /// Executor → orchestrator: the stage failed.
    StageFailed {
        /// Outcome kind followed by detail, e.g. `"TIMEOUT: ..."`.
        reason: String,
    },
    /// Orchestrator → executor: the deployment finished; shut down.
    DeploymentComplete,
}

impl Message {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Abort => "ABORT",
            Self::AbortAck => "ABORT_ACK",
            Self::StageComplete { .. } => "STAGE_COMPLETE",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::DeploymentComplete => "DEPLOYMENT_COMPLETE",
        }
    }
}

/// A message together with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Who sent the message.
    pub sender: ActorId,
    /// The message itself.
    pub message: Message,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(sender: ActorId, message: Message) -> Self {
        Self { sender, message }
    }

    /// Creates an envelope sent by a stage executor.
    #[must_use]
    pub fn from_stage(stage: impl Into<StageId>, message: Message) -> Self {
        Self::new(ActorId::Stage(stage.into()), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Message::Start.kind(), "START");
        assert_eq!(Message::StageFailed { reason: String::new() }.kind(), "STAGE_FAILED");
        assert_eq!(Message::DeploymentComplete.kind(), "DEPLOYMENT_COMPLETE");
    }

    #[test]
    fn test_message_serialize_tagged() {
        let msg = Message::StageComplete { detail: "ok".to_string() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"type": "STAGE_COMPLETE", "detail": "ok"}));
    }

    #[test]
    fn test_actor_display() {
        assert_eq!(ActorId::Orchestrator.to_string(), "orchestrator");
        assert_eq!(ActorId::Stage(StageId::new("calico")).to_string(), "calico");
        assert_eq!(ActorId::Orchestrator.stage(), None);
    }
}
