//! Collector that shells out to system tools.

use super::DiagnosticCollector;
use crate::core::StageId;
use crate::errors::Result;
use crate::runner::redact_line;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Placeholder for a section whose command produced nothing.
pub const NOT_AVAILABLE: &str = "N/A";

/// One titled command whose output becomes a section of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticCommand {
    /// Section title, e.g. `KUBELET`.
    pub title: String,
    /// Program to run.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
}

impl DiagnosticCommand {
    /// Creates a section.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            title: title.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Runs a fixed list of commands and writes their output to one file.
///
/// The default sections are the last hour of kubelet journal entries and
/// the containerd service status.
#[derive(Debug, Clone)]
pub struct CommandDiagnosticCollector {
    output_path: PathBuf,
    commands: Vec<DiagnosticCommand>,
    command_timeout: Duration,
}

impl CommandDiagnosticCollector {
    /// Creates a collector writing to `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            commands: vec![
                DiagnosticCommand::new("KUBELET", "journalctl", ["-u", "kubelet", "--since=-1h", "-n", "50"]),
                DiagnosticCommand::new("CONTAINERD", "systemctl", ["status", "containerd"]),
            ],
            command_timeout: Duration::from_secs(10),
        }
    }

    /// Replaces the command list.
    #[must_use]
    pub fn with_commands(mut self, commands: Vec<DiagnosticCommand>) -> Self {
        self.commands = commands;
        self
    }

    /// Sets the per-command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Where the report is written.
    #[must_use]
    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Commands run for each report.
    #[must_use]
    pub fn commands(&self) -> &[DiagnosticCommand] {
        &self.commands
    }

    async fn capture(&self, command: &DiagnosticCommand) -> String {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.command_timeout, output).await {
            Ok(Ok(output)) => {
                let text = String::from_utf8_lossy(&output.stdout);
                let text = text.trim_end();
                if text.is_empty() {
                    NOT_AVAILABLE.to_string()
                } else {
                    text.lines().map(redact_line).collect::<Vec<_>>().join("\n")
                }
            }
            Ok(Err(e)) => {
                warn!(program = %command.program, error = %e, "Diagnostic command failed");
                NOT_AVAILABLE.to_string()
            }
            Err(_) => {
                warn!(program = %command.program, "Diagnostic command timed out");
                NOT_AVAILABLE.to_string()
            }
        }
    }
}

#[async_trait]
impl DiagnosticCollector for CommandDiagnosticCollector {
    async fn collect(&self, failed_stage: &StageId) -> Result<PathBuf> {
        info!(stage = %failed_stage, path = %self.output_path.display(), "Collecting diagnostic logs");

        let mut sections = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            let body = self.capture(command).await;
            sections.push(format!("=== {} ===\n{body}", command.title));
        }

        tokio::fs::write(&self.output_path, sections.join("\n\n")).await?;
        info!(path = %self.output_path.display(), "Diagnostic logs saved");
        Ok(self.output_path.clone())
    }
}
