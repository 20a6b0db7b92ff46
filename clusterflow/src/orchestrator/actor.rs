//! The orchestrator actor loop.

use super::{alert_for, DeploymentMachine, Effect};
use crate::core::{DeploymentSnapshot, ExecutionResult, Outcome, StageId, StageRecord};
use crate::diagnostics::DiagnosticCollector;
use crate::errors::MailboxClosedError;
use crate::messaging::{ActorId, Address, Envelope, Mailbox, Message};
use crate::plan::DeploymentPlan;
use crate::status::{keys, StatusSink};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// `ansibleStage` value once every stage succeeded.
pub const COMPLETED_MARKER: &str = "COMPLETED";
/// `ansibleStage` value once the deployment failed.
pub const FAILED_MARKER: &str = "FAILED";

/// Actor driving one deployment run.
///
/// It is the only writer of the deployment state. Readers get whole
/// snapshots through [`subscribe`](Self::subscribe).
pub struct Orchestrator {
    run_id: Uuid,
    machine: DeploymentMachine,
    executors: Vec<(StageId, Address)>,
    sink: Arc<dyn StatusSink>,
    diagnostics: Arc<dyn DiagnosticCollector>,
    snapshots: watch::Sender<DeploymentSnapshot>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("run_id", &self.run_id)
            .field("state", &self.machine.state())
            .field("executors", &self.executors.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator for `plan` with one executor address per stage.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        plan: &DeploymentPlan,
        executors: Vec<(StageId, Address)>,
        sink: Arc<dyn StatusSink>,
        diagnostics: Arc<dyn DiagnosticCollector>,
    ) -> Self {
        let machine = DeploymentMachine::new(plan);
        let (snapshots, _) = watch::channel(machine.snapshot(run_id));
        Self {
            run_id,
            machine,
            executors,
            sink,
            diagnostics,
            snapshots,
        }
    }

    /// Returns a receiver of published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeploymentSnapshot> {
        self.snapshots.subscribe()
    }

    /// Runs until the deployment settles and returns the final snapshot.
    ///
    /// The run starts when `trigger` fires. If the trigger is dropped
    /// first, the run never starts and the executors are shut down.
    pub async fn run(mut self, mut inbox: Mailbox, mut trigger: oneshot::Receiver<()>) -> DeploymentSnapshot {
        let mut awaiting_trigger = true;
        let mut published = self.machine.snapshot(self.run_id);

        while !self.machine.is_settled() {
            tokio::select! {
                fired = &mut trigger, if awaiting_trigger => {
                    awaiting_trigger = false;
                    if fired.is_err() {
                        info!(run_id = %self.run_id, "Start trigger dropped, deployment will not run");
                        break;
                    }
                    let effects = self.machine.start();
                    if !effects.is_empty() {
                        self.sink.update(keys::CLUSTER_STATUS, json!("DEPLOYING")).await;
                    }
                    self.apply(effects).await;
                }
                envelope = inbox.recv() => match envelope {
                    Some(envelope) => {
                        debug!(sender = %envelope.sender, message = envelope.message.kind(), "Orchestrator received message");
                        let effects = self.machine.handle(&envelope);
                        self.apply(effects).await;
                    }
                    None => {
                        warn!(run_id = %self.run_id, "Orchestrator mailbox closed");
                        break;
                    }
                }
            }
            published = self.publish(published).await;
        }

        self.shutdown();
        let last = self.publish(published).await;
        info!(run_id = %self.run_id, phase = %last.state.phase, "Orchestrator stopped");
        last
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Start(stage) => {
                    self.sink.update(keys::ANSIBLE_STAGE, json!(stage.as_str())).await;
                    if let Err(e) = self.send(&stage, Message::Start) {
                        warn!(stage = %stage, error = %e, "Could not start stage");
                        let reason = ExecutionResult::exception(e.to_string()).failure_reason();
                        let envelope = Envelope::from_stage(stage, Message::StageFailed { reason });
                        queue.extend(self.machine.handle(&envelope));
                    }
                }
                Effect::Abort(stages) => {
                    for stage in stages {
                        if let Err(e) = self.send(&stage, Message::Abort) {
                            warn!(stage = %stage, error = %e, "Could not deliver ABORT");
                            self.machine.abort_unreachable(&stage);
                        }
                    }
                }
                Effect::Completed => self.finalize().await,
                Effect::Failed { stage, outcome, reason } => self.report_failure(&stage, outcome, &reason).await,
            }
        }
    }

    async fn finalize(&self) {
        info!("=== DEPLOYMENT SUMMARY ===");
        for record in self.machine.records() {
            info!(
                stage = %record.stage_id,
                status = %record.status,
                duration_ms = record.duration_ms.unwrap_or_default(),
                "{}: {} ({:.0} ms) {}",
                record.stage_id,
                record.status,
                record.duration_ms.unwrap_or_default(),
                record.last_message.lines().last().unwrap_or_default()
            );
        }
        self.sink.update(keys::STAGE_SUMMARY, summary(self.machine.records())).await;
        self.sink.update(keys::CLUSTER_STATUS, json!("DEPLOYED")).await;
        self.sink.update(keys::ANSIBLE_STAGE, json!(COMPLETED_MARKER)).await;
    }

    async fn report_failure(&self, stage: &StageId, outcome: Outcome, reason: &str) {
        error!(stage = %stage, outcome = %outcome, "Stage {stage} failed: {outcome} | Details: {reason}");

        self.sink.push_alert(&alert_for(stage, outcome)).await;
        self.sink.update(keys::ANSIBLE_STAGE, json!(FAILED_MARKER)).await;
        self.sink.update(keys::CLUSTER_STATUS, json!("FAILED")).await;

        let location = match self.diagnostics.collect(stage).await {
            Ok(path) => path.display().to_string(),
            Err(e) => {
                error!(stage = %stage, error = %e, "Failed to collect diagnostic logs");
                String::new()
            }
        };
        self.sink.update(keys::DIAGNOSTIC_LOGS, json!(location)).await;
    }

    fn send(&self, stage: &StageId, message: Message) -> Result<(), MailboxClosedError> {
        let (_, address) = self
            .executors
            .iter()
            .find(|(id, _)| id == stage)
            .ok_or_else(|| MailboxClosedError::new(stage.as_str()))?;
        address.send(ActorId::Orchestrator, message)
    }

    fn shutdown(&self) {
        for (stage, address) in &self.executors {
            if let Err(e) = address.send(ActorId::Orchestrator, Message::DeploymentComplete) {
                debug!(stage = %stage, error = %e, "Executor already stopped");
            }
        }
    }

    /// Publishes the current snapshot and pushes phase and summary changes
    /// to the status sink.
    async fn publish(&self, previous: DeploymentSnapshot) -> DeploymentSnapshot {
        let current = self.machine.snapshot(self.run_id);
        if current.state.phase != previous.state.phase {
            self.sink
                .update(keys::DEPLOYMENT_PHASE, json!(current.state.phase.to_string()))
                .await;
        }
        let changed = current
            .records
            .iter()
            .zip(&previous.records)
            .any(|(a, b)| a.status != b.status);
        if changed {
            self.sink.update(keys::STAGE_SUMMARY, summary(&current.records)).await;
        }
        self.snapshots.send_replace(current.clone());
        current
    }
}

fn summary(records: &[StageRecord]) -> Value {
    Value::Object(
        records
            .iter()
            .map(|r| (r.stage_id.to_string(), json!(r.status.to_string())))
            .collect::<Map<_, _>>(),
    )
}
