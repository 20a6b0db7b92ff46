//! External command execution.
//!
//! A [`CommandRunner`] turns one [`StageSpec`] into exactly one
//! [`ExecutionResult`]. Runners never return errors: spawn failures,
//! timeouts and non-zero exits are all encoded in the result.

mod classify;
mod process;
mod redact;

pub use classify::{classify_exit, has_connection_marker, CONNECTION_MARKERS};
pub use process::ProcessRunner;
pub use redact::{redact_line, MASK};

use crate::core::ExecutionResult;
use crate::plan::StageSpec;
use async_trait::async_trait;

/// Trait for anything that can execute a stage's command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command described by `spec` to completion or timeout.
    async fn run(&self, spec: &StageSpec) -> ExecutionResult;
}
