//! Diagnostic collection after a failed stage.

mod command;

pub use command::{CommandDiagnosticCollector, DiagnosticCommand, NOT_AVAILABLE};

use crate::core::StageId;
use crate::errors::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Gathers node logs when a deployment fails.
#[async_trait]
pub trait DiagnosticCollector: Send + Sync {
    /// Collects diagnostics for `failed_stage` and returns where they were
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error if the diagnostics could not be stored. Callers log
    /// it and carry on.
    async fn collect(&self, failed_stage: &StageId) -> Result<PathBuf>;
}
