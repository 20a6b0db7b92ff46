//! Stage specifications.

use crate::core::StageId;
use crate::errors::PlanValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to run one stage's external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// The unique id of the stage.
    pub id: StageId,
    /// Program to execute.
    pub command: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory the program runs in. Must exist at run time.
    pub working_dir: PathBuf,
    /// Environment variables set on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Upper bound on the run time of the command.
    pub timeout: Duration,
}

impl StageSpec {
    /// Creates a stage spec running `command` in the current directory
    /// with a 30 minute timeout.
    #[must_use]
    pub fn new(id: impl Into<StageId>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Sets the arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Sets one environment variable, replacing any previous value.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Renders the command line for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero.
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        if self.timeout.is_zero() {
            return Err(PlanValidationError::zero_timeout(self.id.as_str()));
        }
        Ok(())
    }
}
