//! Subprocess runner with merged output, redaction and a hard timeout.

use super::{classify_exit, redact_line, CommandRunner};
use crate::core::ExecutionResult;
use crate::observability::SpanTimer;
use crate::plan::StageSpec;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maximum bytes kept from a single output line.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Appended to a line cut at [`MAX_LINE_LENGTH`].
const TRUNCATED_MARKER: &str = "...[truncated]";

/// How long output may keep draining after the child has exited.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Runs stage commands as local child processes.
///
/// stdout and stderr are merged into one line stream in arrival order. Each
/// line is redacted before it is logged or stored. Lines longer than 64 KiB
/// are cut and marked `...[truncated]`.
///
/// The timeout bounds the child itself, not its output streams. Once the
/// child exits, output still held open by its background processes is read
/// for a short grace period and then dropped. When the timeout expires the
/// child is killed and reaped before the result is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &StageSpec) -> ExecutionResult {
        if !spec.working_dir.is_dir() {
            return ExecutionResult::exception(format!(
                "Working directory does not exist: {}",
                spec.working_dir.display()
            ));
        }

        info!(
            stage = %spec.id,
            command = %spec.command_line(),
            working_dir = %spec.working_dir.display(),
            timeout_secs = spec.timeout.as_secs(),
            "Executing command"
        );
        let timer = SpanTimer::start(spec.id.as_str());

        let mut child = match Command::new(&spec.command)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(stage = %spec.id, error = %e, "Failed to spawn command");
                return ExecutionResult::exception(format!("Failed to spawn '{}': {e}", spec.command));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        let stage = spec.id.as_str();
        let mut collector = spawn_collector(stage.to_string(), rx);

        let waited = tokio::time::timeout(spec.timeout, child.wait()).await;
        let result = match waited {
            Err(_) => {
                warn!(stage, timeout_secs = spec.timeout.as_secs(), "Command timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(stage, error = %e, "Failed to kill timed out command");
                }
                for reader in &readers {
                    reader.abort();
                }
                collector.abort();
                ExecutionResult::timeout(format!("Timed out after {}s", spec.timeout.as_secs()))
            }
            Ok(Err(e)) => {
                for reader in &readers {
                    reader.abort();
                }
                collector.abort();
                ExecutionResult::exception(format!("Failed to wait for '{}': {e}", spec.command))
            }
            Ok(Ok(status)) => {
                // Background processes may keep the pipes open after the child exits.
                let drained = tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut collector).await;
                let output = match drained {
                    Ok(joined) => joined,
                    Err(_) => {
                        debug!(stage, "Output still open after exit, closing readers");
                        for reader in &readers {
                            reader.abort();
                        }
                        collector.await
                    }
                }
                .unwrap_or_default();
                let exit_code = status.code().unwrap_or(-1);
                let outcome = classify_exit(exit_code, &output);
                if outcome.is_success() {
                    ExecutionResult::success(output)
                } else {
                    ExecutionResult::failed(outcome, exit_code, output)
                }
            }
        };

        info!(
            stage,
            outcome = %result.outcome,
            exit_code = ?result.exit_code,
            duration_ms = timer.finish(),
            "Command finished"
        );
        result
    }
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let truncated = buf.len() > MAX_LINE_LENGTH;
                    buf.truncate(MAX_LINE_LENGTH);
                    let mut line = String::from_utf8_lossy(&buf).into_owned();
                    if truncated {
                        line.push_str(TRUNCATED_MARKER);
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Output stream closed with error");
                    break;
                }
            }
        }
    })
}

fn spawn_collector(stage: String, mut rx: mpsc::UnboundedReceiver<String>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut output = String::new();
        while let Some(line) = rx.recv().await {
            let safe = redact_line(&line);
            info!(stage = %stage, "{} | {}", stage, safe);
            output.push_str(&safe);
            output.push('\n');
        }
        output
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::Outcome;
    use std::time::Instant;

    fn shell(id: &str, script: &str) -> StageSpec {
        StageSpec::new(id, "sh")
            .with_args(["-c", script])
            .with_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_success_preserves_output() {
        let spec = shell("echo", "echo first; echo second");
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.detail, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_output_is_redacted() {
        let spec = shell("secrets", "echo password=hunter2; echo plain line");
        let result = ProcessRunner::new().run(&spec).await;

        assert!(result.is_success());
        assert_eq!(result.detail, "password=***MASKED***\nplain line\n");
        assert!(!result.detail.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_stderr_is_merged() {
        let spec = shell("stderr", "echo to-stderr 1>&2");
        let result = ProcessRunner::new().run(&spec).await;

        assert!(result.is_success());
        assert!(result.detail.contains("to-stderr"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_execution_error() {
        let spec = shell("fail", "echo 'fatal: task failed'; exit 3");
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::ExecutionError);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.detail.contains("fatal: task failed"));
    }

    #[tokio::test]
    async fn test_unreachable_is_connection_failure() {
        let spec = shell("unreachable", "echo 'fatal: [w1]: UNREACHABLE!' 1>&2; exit 4");
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::ConnectionFailure);
        assert_eq!(result.exit_code, Some(4));
    }

    #[tokio::test]
    async fn test_env_and_working_dir_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell("env", "echo \"$STAGE_MARKER\"; pwd")
            .with_env("STAGE_MARKER", "from-env")
            .with_working_dir(dir.path());
        let result = ProcessRunner::new().run(&spec).await;

        assert!(result.is_success());
        let canonical = dir.path().canonicalize().unwrap();
        assert!(result.detail.contains("from-env"));
        assert!(result.detail.contains(canonical.to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!(
            "echo $$ > {}; echo 'UNREACHABLE!'; exec sleep 30",
            pid_file.display()
        );
        let spec = shell("slow", &script).with_timeout(Duration::from_millis(500));

        let started = Instant::now();
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(10));

        #[cfg(target_os = "linux")]
        {
            let pid = std::fs::read_to_string(&pid_file).unwrap();
            let proc_path = format!("/proc/{}", pid.trim());
            assert!(!std::path::Path::new(&proc_path).exists());
        }
    }

    #[tokio::test]
    async fn test_background_child_does_not_hold_the_stage() {
        let spec = shell("daemon", "sleep 5 & echo started; exit 0").with_timeout(Duration::from_secs(1));

        let started = Instant::now();
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.detail, "started\n");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_long_line_is_marked_truncated() {
        let spec = shell("long", "head -c 70000 /dev/zero | tr '\\0' a; echo; echo next");
        let result = ProcessRunner::new().run(&spec).await;

        assert!(result.is_success());
        let lines: Vec<&str> = result.detail.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_LENGTH + TRUNCATED_MARKER.len());
        assert!(lines[0].ends_with(TRUNCATED_MARKER));
        assert_eq!(lines[1], "next");
    }

    #[tokio::test]
    async fn test_missing_program_is_exception() {
        let spec = StageSpec::new("missing", "definitely-not-a-real-binary-xyz");
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::Exception);
        assert!(result.detail.contains("definitely-not-a-real-binary-xyz"));
    }

    #[tokio::test]
    async fn test_missing_working_dir_is_exception() {
        let spec = shell("nowhere", "true").with_working_dir("/definitely/not/here");
        let result = ProcessRunner::new().run(&spec).await;

        assert_eq!(result.outcome, Outcome::Exception);
        assert!(result.detail.starts_with("Working directory does not exist"));
    }
}
