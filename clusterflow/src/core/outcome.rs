//! Classified results of external command runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one external command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Exited with code 0 inside the timeout.
    Success,
    /// Did not finish inside the timeout and was killed.
    Timeout,
    /// Non-zero exit with connectivity markers in the output.
    ConnectionFailure,
    /// Non-zero exit without connectivity markers.
    ExecutionError,
    /// Spawning or reading the process failed.
    Exception,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ConnectionFailure => write!(f, "CONNECTION_FAILURE"),
            Self::ExecutionError => write!(f, "EXECUTION_ERROR"),
            Self::Exception => write!(f, "EXCEPTION"),
        }
    }
}

impl Outcome {
    /// Returns true only for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Parses the kind prefix of a failure reason (`"TIMEOUT: ..."`).
    #[must_use]
    pub fn from_reason(reason: &str) -> Option<Self> {
        let kind = reason.split(':').next()?.trim();
        match kind {
            "SUCCESS" => Some(Self::Success),
            "TIMEOUT" => Some(Self::Timeout),
            "CONNECTION_FAILURE" => Some(Self::ConnectionFailure),
            "EXECUTION_ERROR" => Some(Self::ExecutionError),
            "EXCEPTION" => Some(Self::Exception),
            _ => None,
        }
    }
}

/// The single terminal result of one external command run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// How the run ended.
    pub outcome: Outcome,
    /// Exit code, absent on timeout or exception.
    pub exit_code: Option<i32>,
    /// Redacted output, or the exception text.
    pub detail: String,
}

impl ExecutionResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            exit_code: Some(0),
            detail: detail.into(),
        }
    }

    /// Creates a timeout result.
    #[must_use]
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Timeout,
            exit_code: None,
            detail: detail.into(),
        }
    }

    /// Creates a result for a non-zero exit.
    #[must_use]
    pub fn failed(outcome: Outcome, exit_code: i32, detail: impl Into<String>) -> Self {
        Self {
            outcome,
            exit_code: Some(exit_code),
            detail: detail.into(),
        }
    }

    /// Creates an exception result.
    #[must_use]
    pub fn exception(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Exception,
            exit_code: None,
            detail: detail.into(),
        }
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Formats the failure reason carried by `STAGE_FAILED`.
    ///
    /// The outcome kind always comes first so receivers can recover it with
    /// [`Outcome::from_reason`].
    #[must_use]
    pub fn failure_reason(&self) -> String {
        match self.exit_code {
            Some(code) => format!("{}: exit code {code}: {}", self.outcome, self.detail),
            None => format!("{}: {}", self.outcome, self.detail),
        }
    }
}
