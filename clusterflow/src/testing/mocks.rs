//! Test doubles for the runner and diagnostics seams.

use crate::core::{ExecutionResult, StageId};
use crate::diagnostics::DiagnosticCollector;
use crate::errors::Result;
use crate::plan::StageSpec;
use crate::runner::CommandRunner;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// A runner that returns canned results per stage.
///
/// Stages without a scripted result succeed with `"<id> ok"`.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    results: HashMap<String, ExecutionResult>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<StageId>>,
}

impl ScriptedRunner {
    /// Creates a runner where every stage succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the result of one stage.
    #[must_use]
    pub fn with_result(mut self, stage: &str, result: ExecutionResult) -> Self {
        self.results.insert(stage.to_string(), result);
        self
    }

    /// Delays one stage's result.
    #[must_use]
    pub fn with_delay(mut self, stage: &str, delay: Duration) -> Self {
        self.delays.insert(stage.to_string(), delay);
        self
    }

    /// Returns the stages run so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<StageId> {
        self.calls.lock().clone()
    }

    /// Returns how many times a stage was run.
    #[must_use]
    pub fn call_count(&self, stage: &str) -> usize {
        self.calls.lock().iter().filter(|id| id.as_str() == stage).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &StageSpec) -> ExecutionResult {
        self.calls.lock().push(spec.id.clone());
        if let Some(delay) = self.delays.get(spec.id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.results
            .get(spec.id.as_str())
            .cloned()
            .unwrap_or_else(|| ExecutionResult::success(format!("{} ok", spec.id)))
    }
}

/// A diagnostic collector that records which stages it was asked about.
#[derive(Debug)]
pub struct RecordingDiagnostics {
    location: PathBuf,
    collected: Mutex<Vec<StageId>>,
}

impl Default for RecordingDiagnostics {
    fn default() -> Self {
        Self::new("diagnostic-logs.txt")
    }
}

impl RecordingDiagnostics {
    /// Creates a collector that reports `location` as its output.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            collected: Mutex::new(Vec::new()),
        }
    }

    /// Stages diagnostics were collected for.
    #[must_use]
    pub fn collected(&self) -> Vec<StageId> {
        self.collected.lock().clone()
    }
}

#[async_trait]
impl DiagnosticCollector for RecordingDiagnostics {
    async fn collect(&self, failed_stage: &StageId) -> Result<PathBuf> {
        self.collected.lock().push(failed_stage.clone());
        Ok(self.location.clone())
    }
}

/// A diagnostic collector that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingDiagnostics;

#[async_trait]
impl DiagnosticCollector for FailingDiagnostics {
    async fn collect(&self, _failed_stage: &StageId) -> Result<PathBuf> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "diagnostics disabled").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Outcome;

    #[tokio::test]
    async fn test_scripted_runner() {
        let runner = ScriptedRunner::new()
            .with_result("b", ExecutionResult::timeout("slow"));

        let a = runner.run(&StageSpec::new("a", "true")).await;
        let b = runner.run(&StageSpec::new("b", "true")).await;

        assert!(a.is_success());
        assert_eq!(a.detail, "a ok");
        assert_eq!(b.outcome, Outcome::Timeout);
        assert_eq!(runner.calls(), vec![StageId::new("a"), StageId::new("b")]);
        assert_eq!(runner.call_count("a"), 1);
    }

    #[tokio::test]
    async fn test_recording_diagnostics() {
        let diagnostics = RecordingDiagnostics::new("/tmp/diag.txt");
        let path = diagnostics.collect(&StageId::new("calico")).await.unwrap();

        assert_eq!(path, PathBuf::from("/tmp/diag.txt"));
        assert_eq!(diagnostics.collected(), vec![StageId::new("calico")]);
        assert!(FailingDiagnostics.collect(&StageId::new("x")).await.is_err());
    }
}
