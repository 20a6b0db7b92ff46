//! The per-stage executor actor.

use crate::core::{ExecutionResult, StageId};
use crate::messaging::{mailbox, ActorId, Address, Envelope, Mailbox, Message};
use crate::plan::StageSpec;
use crate::runner::CommandRunner;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Waiting for `START` or `ABORT`.
    Idle,
    /// The external command is in flight on a worker task.
    Running,
    /// Done; every further message is ignored.
    Terminated,
}

/// Actor that runs one stage's command on request.
///
/// The command runs on a separate worker task so the mailbox keeps being
/// served while it is in flight. An `ABORT` received in that window is
/// acknowledged but does not stop the process; only the runner's timeout
/// can do that.
pub struct StageExecutor {
    spec: Arc<StageSpec>,
    runner: Arc<dyn CommandRunner>,
    orchestrator: Address,
    state: ExecutorState,
    abort_requested: bool,
    shutdown_requested: bool,
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("stage", &self.spec.id)
            .field("state", &self.state)
            .field("abort_requested", &self.abort_requested)
            .finish_non_exhaustive()
    }
}

/// Spawns an executor for `spec` on the runtime.
///
/// Returns the executor's address and the handle of its loop, which
/// resolves to the final state.
pub fn spawn_executor(
    spec: StageSpec,
    runner: Arc<dyn CommandRunner>,
    orchestrator: Address,
) -> (Address, JoinHandle<ExecutorState>) {
    let (address, inbox) = mailbox(spec.id.as_str());
    let executor = StageExecutor::new(spec, runner, orchestrator);
    let handle = tokio::spawn(executor.run(inbox));
    (address, handle)
}

impl StageExecutor {
    /// Creates an idle executor.
    #[must_use]
    pub fn new(spec: StageSpec, runner: Arc<dyn CommandRunner>, orchestrator: Address) -> Self {
        Self {
            spec: Arc::new(spec),
            runner,
            orchestrator,
            state: ExecutorState::Idle,
            abort_requested: false,
            shutdown_requested: false,
        }
    }

    /// The stage this executor owns.
    #[must_use]
    pub fn stage_id(&self) -> &StageId {
        &self.spec.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Serves the mailbox until shutdown and returns the final state.
    ///
    /// The loop ends on `DEPLOYMENT_COMPLETE` or when every address of the
    /// mailbox is gone. An in-flight command is always waited for first.
    pub async fn run(mut self, mut inbox: Mailbox) -> ExecutorState {
        let mut worker: Option<JoinHandle<ExecutionResult>> = None;
        let mut inbox_open = true;

        loop {
            if worker.is_none() && (self.shutdown_requested || !inbox_open) {
                break;
            }

            tokio::select! {
                envelope = inbox.recv(), if inbox_open => match envelope {
                    Some(envelope) => {
                        if let Some(handle) = self.handle(envelope) {
                            worker = Some(handle);
                        }
                    }
                    None => {
                        debug!(stage = %self.spec.id, "Mailbox closed");
                        inbox_open = false;
                    }
                },
                result = join_worker(&mut worker), if worker.is_some() => {
                    worker = None;
                    self.report(result);
                }
            }
        }

        debug!(stage = %self.spec.id, state = ?self.state, "Executor stopped");
        self.state
    }

    fn handle(&mut self, envelope: Envelope) -> Option<JoinHandle<ExecutionResult>> {
        let stage = &self.spec.id;
        match (self.state, envelope.message) {
            (_, Message::DeploymentComplete) => {
                debug!(stage = %stage, "Deployment complete, shutting down");
                self.shutdown_requested = true;
                None
            }
            (ExecutorState::Idle, Message::Start) => {
                info!(stage = %stage, "Starting stage");
                self.state = ExecutorState::Running;
                Some(self.launch())
            }
            (ExecutorState::Idle, Message::Abort) => {
                info!(stage = %stage, "Aborted before start");
                self.acknowledge_abort();
                self.state = ExecutorState::Terminated;
                None
            }
            (ExecutorState::Running, Message::Abort) => {
                warn!(stage = %stage, "Abort received while running; command keeps running until it exits or times out");
                self.abort_requested = true;
                self.acknowledge_abort();
                None
            }
            (ExecutorState::Running, Message::Start) => {
                debug!(stage = %stage, "Duplicate START ignored");
                None
            }
            (ExecutorState::Terminated, message) => {
                debug!(stage = %stage, message = message.kind(), "Executor terminated, message ignored");
                None
            }
            (state, message) => {
                warn!(stage = %stage, state = ?state, message = message.kind(), sender = %envelope.sender, "Unexpected message");
                None
            }
        }
    }

    fn launch(&self) -> JoinHandle<ExecutionResult> {
        let spec = Arc::clone(&self.spec);
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move { runner.run(&spec).await })
    }

    fn acknowledge_abort(&self) {
        self.send(Message::AbortAck);
    }

    fn report(&mut self, result: ExecutionResult) {
        let message = if result.is_success() {
            info!(stage = %self.spec.id, "Stage completed");
            Message::StageComplete { detail: result.detail }
        } else {
            warn!(stage = %self.spec.id, outcome = %result.outcome, exit_code = ?result.exit_code, "Stage failed");
            Message::StageFailed {
                reason: result.failure_reason(),
            }
        };
        self.send(message);
        self.state = ExecutorState::Terminated;
    }

    fn send(&self, message: Message) {
        let kind = message.kind();
        if let Err(e) = self
            .orchestrator
            .send(ActorId::Stage(self.spec.id.clone()), message)
        {
            warn!(stage = %self.spec.id, message = kind, error = %e, "Failed to reach orchestrator");
        }
    }
}

async fn join_worker(worker: &mut Option<JoinHandle<ExecutionResult>>) -> ExecutionResult {
    match worker {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(e) => ExecutionResult::exception(format!("Worker task failed: {e}")),
        },
        None => std::future::pending().await,
    }
}
