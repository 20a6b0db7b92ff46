//! Error types for the clusterflow orchestration engine.
//!
//! Only construction-time and plumbing failures surface as errors. Anything
//! that happens once a deployment is running is converted into an
//! [`ExecutionResult`](crate::core::ExecutionResult) or an actor message.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ClusterflowError>;

/// The main error type for clusterflow operations.
#[derive(Debug, Error)]
pub enum ClusterflowError {
    /// The deployment plan is invalid.
    #[error("{0}")]
    PlanValidation(#[from] PlanValidationError),

    /// The configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An actor mailbox was closed while a message was being delivered.
    #[error("{0}")]
    MailboxClosed(#[from] MailboxClosedError),

    /// The deployment was already started.
    #[error("Deployment already started")]
    AlreadyStarted,

    /// An actor task terminated abnormally.
    #[error("Actor task failed: {0}")]
    ActorFailed(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata describing why a plan failed validation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanErrorInfo {
    /// Error code (e.g., "PLAN-002-DUPLICATE").
    pub code: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl PlanErrorInfo {
    /// Creates new error info with the given code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a deployment plan cannot be built.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlanValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Structured error info.
    pub error_info: PlanErrorInfo,
}

impl PlanValidationError {
    /// The plan contains no stages.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            message: "Deployment plan must contain at least one stage".to_string(),
            stages: Vec::new(),
            error_info: PlanErrorInfo::new("PLAN-001-EMPTY")
                .with_fix_hint("Add at least one stage before launching a deployment."),
        }
    }

    /// A stage id appears more than once.
    #[must_use]
    pub fn duplicate(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            message: format!("Duplicate stage id in plan: '{stage}'"),
            error_info: PlanErrorInfo::new("PLAN-002-DUPLICATE")
                .with_fix_hint("Stage ids must be unique within one plan.")
                .with_context_entry("stage", stage.clone()),
            stages: vec![stage],
        }
    }

    /// A stage has a zero timeout.
    #[must_use]
    pub fn zero_timeout(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            message: format!("Stage '{stage}' has a zero timeout"),
            error_info: PlanErrorInfo::new("PLAN-003-TIMEOUT")
                .with_fix_hint("Every stage needs a positive timeout."),
            stages: vec![stage],
        }
    }

    /// A stage id is not present in the stage catalogue.
    #[must_use]
    pub fn unknown_stage(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            message: format!("Unknown stage id: '{stage}'"),
            error_info: PlanErrorInfo::new("PLAN-004-UNKNOWN")
                .with_fix_hint("Use one of the ids listed in the stage catalogue.")
                .with_context_entry("stage", stage.clone()),
            stages: vec![stage],
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment override holds an unusable value.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Environment variable name.
        var: String,
        /// The offending value.
        value: String,
    },

    /// A required file or directory does not exist.
    #[error("{what} not found: {}", path.display())]
    MissingPath {
        /// Human readable name of the missing item.
        what: &'static str,
        /// The path that was checked.
        path: PathBuf,
    },

    /// The per-stage timeout is zero.
    #[error("timeout_minutes must be greater than zero")]
    ZeroTimeout,
}

/// Error raised when a message cannot be delivered because the receiver is gone.
#[derive(Debug, Clone, Error)]
#[error("Mailbox of '{receiver}' is closed")]
pub struct MailboxClosedError {
    /// Name of the actor that owned the mailbox.
    pub receiver: String,
}

impl MailboxClosedError {
    /// Creates a new mailbox closed error.
    #[must_use]
    pub fn new(receiver: impl Into<String>) -> Self {
        Self {
            receiver: receiver.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_error_carries_stage() {
        let err = PlanValidationError::duplicate("install");

        assert_eq!(err.stages, vec!["install".to_string()]);
        assert_eq!(err.error_info.code, "PLAN-002-DUPLICATE");
        assert!(err.to_string().contains("'install'"));
    }

    #[test]
    fn test_plan_error_converts_into_main_error() {
        let err: ClusterflowError = PlanValidationError::empty().into();
        assert!(matches!(err, ClusterflowError::PlanValidation(_)));
    }

    #[test]
    fn test_missing_path_message() {
        let err = ConfigError::MissingPath {
            what: "Inventory",
            path: PathBuf::from("/nope/inventory.ini"),
        };
        assert_eq!(err.to_string(), "Inventory not found: /nope/inventory.ini");
    }

    #[test]
    fn test_mailbox_closed_message() {
        let err = MailboxClosedError::new("orchestrator");
        assert_eq!(err.to_string(), "Mailbox of 'orchestrator' is closed");
    }
}
