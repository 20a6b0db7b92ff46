//! The deployment state machine.
//!
//! [`DeploymentMachine`] owns [`DeploymentState`] and the stage records and
//! decides every transition. It performs no IO: each call returns the
//! [`Effect`]s the orchestrator actor must carry out.

use crate::core::{
    DeploymentPhase, DeploymentSnapshot, DeploymentState, Outcome, StageId, StageRecord, StageStatus,
};
use crate::messaging::{ActorId, Envelope, Message};
use crate::plan::DeploymentPlan;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send `START` to a stage.
    Start(StageId),
    /// Send `ABORT` to each of these stages.
    Abort(Vec<StageId>),
    /// Every stage succeeded; run the finalize step.
    Completed,
    /// A stage failed; alert and collect diagnostics. Follows the abort
    /// broadcast when there is one.
    Failed {
        /// The failed stage.
        stage: StageId,
        /// Outcome kind parsed from the failure reason.
        outcome: Outcome,
        /// Full failure reason.
        reason: String,
    },
}

/// Single-writer state of one deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentMachine {
    state: DeploymentState,
    records: Vec<StageRecord>,
    started_at: Vec<Option<Instant>>,
}

impl DeploymentMachine {
    /// Creates a machine with every stage pending.
    #[must_use]
    pub fn new(plan: &DeploymentPlan) -> Self {
        let records: Vec<StageRecord> = plan.iter().map(|s| StageRecord::pending(s.id.clone())).collect();
        Self {
            state: DeploymentState::default(),
            started_at: vec![None; records.len()],
            records,
        }
    }

    /// Current phase and cursor.
    #[must_use]
    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Records in plan order.
    #[must_use]
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Record of one stage.
    #[must_use]
    pub fn record(&self, stage: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage_id.as_str() == stage)
    }

    /// Copies the state into a snapshot.
    #[must_use]
    pub fn snapshot(&self, run_id: Uuid) -> DeploymentSnapshot {
        DeploymentSnapshot {
            run_id,
            state: self.state,
            records: self.records.clone(),
        }
    }

    /// True once the phase is terminal and no abort is still outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.phase.is_terminal() && !self.records.iter().any(|r| r.status.is_abortable())
    }

    /// Starts the deployment. Only the first call has an effect.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.state.phase != DeploymentPhase::NotStarted {
            debug!(phase = %self.state.phase, "Deployment already started");
            return Vec::new();
        }
        self.state.phase = DeploymentPhase::Running;
        self.state.current_index = 0;
        info!(stages = self.records.len(), "Deployment started");
        vec![self.begin(0)]
    }

    /// Applies one inbound message.
    pub fn handle(&mut self, envelope: &Envelope) -> Vec<Effect> {
        let Some(index) = self.index_of_sender(&envelope.sender) else {
            warn!(sender = %envelope.sender, message = envelope.message.kind(), "Message from unknown sender ignored");
            return Vec::new();
        };

        if let Message::AbortAck = envelope.message {
            self.on_abort_ack(index);
            return Vec::new();
        }

        if self.state.phase != DeploymentPhase::Running {
            debug!(
                stage = %self.records[index].stage_id,
                phase = %self.state.phase,
                message = envelope.message.kind(),
                "Deployment not running, message ignored"
            );
            return Vec::new();
        }

        match &envelope.message {
            Message::StageComplete { detail } => self.on_complete(index, detail),
            Message::StageFailed { reason } => self.on_failed(index, reason),
            other => {
                warn!(stage = %self.records[index].stage_id, message = other.kind(), "Unexpected message from executor");
                Vec::new()
            }
        }
    }

    /// Marks a stage aborted without an acknowledgement, for executors that
    /// can no longer be reached.
    pub fn abort_unreachable(&mut self, stage: &StageId) {
        if let Some(record) = self.records.iter_mut().find(|r| &r.stage_id == stage) {
            if record.status.is_abortable() {
                record.transition(StageStatus::Aborted, "Executor unavailable");
            }
        }
    }

    fn index_of_sender(&self, sender: &ActorId) -> Option<usize> {
        let stage = sender.stage()?;
        self.records.iter().position(|r| &r.stage_id == stage)
    }

    fn begin(&mut self, index: usize) -> Effect {
        let record = &mut self.records[index];
        record.transition(StageStatus::Running, "");
        self.started_at[index] = Some(Instant::now());
        Effect::Start(record.stage_id.clone())
    }

    fn finish(&mut self, index: usize, status: StageStatus, message: &str) {
        let duration = self.started_at[index].map(|t| t.elapsed().as_secs_f64() * 1000.0);
        let record = &mut self.records[index];
        record.transition(status, message);
        record.duration_ms = duration;
    }

    fn on_complete(&mut self, index: usize, detail: &str) -> Vec<Effect> {
        if index != self.state.current_index || self.records[index].status != StageStatus::Running {
            debug!(
                stage = %self.records[index].stage_id,
                status = %self.records[index].status,
                current_index = self.state.current_index,
                "Stale STAGE_COMPLETE ignored"
            );
            return Vec::new();
        }

        self.finish(index, StageStatus::Succeeded, detail);
        info!(stage = %self.records[index].stage_id, "Stage succeeded");

        let next = index + 1;
        self.state.current_index = next;
        if next == self.records.len() {
            self.state.phase = DeploymentPhase::Completed;
            info!("All stages succeeded");
            vec![Effect::Completed]
        } else {
            vec![self.begin(next)]
        }
    }

    fn on_failed(&mut self, index: usize, reason: &str) -> Vec<Effect> {
        if self.records[index].status.is_terminal() {
            debug!(
                stage = %self.records[index].stage_id,
                status = %self.records[index].status,
                "STAGE_FAILED for finished stage ignored"
            );
            return Vec::new();
        }

        self.finish(index, StageStatus::Failed, reason);
        self.state.phase = DeploymentPhase::Failed;
        let stage = self.records[index].stage_id.clone();
        let outcome = Outcome::from_reason(reason).unwrap_or(Outcome::Exception);
        warn!(stage = %stage, outcome = %outcome, "Stage failed, deployment aborted");

        let to_abort: Vec<StageId> = self
            .records
            .iter()
            .filter(|r| r.status.is_abortable())
            .map(|r| r.stage_id.clone())
            .collect();

        let mut effects = Vec::with_capacity(2);
        if !to_abort.is_empty() {
            effects.push(Effect::Abort(to_abort));
        }
        effects.push(Effect::Failed {
            stage,
            outcome,
            reason: reason.to_string(),
        });
        effects
    }

    fn on_abort_ack(&mut self, index: usize) {
        let record = &mut self.records[index];
        if self.state.phase == DeploymentPhase::Failed && record.status.is_abortable() {
            record.transition(StageStatus::Aborted, "Aborted after deployment failure");
            debug!(stage = %record.stage_id, "Abort acknowledged");
        } else {
            debug!(stage = %record.stage_id, status = %record.status, "ABORT_ACK ignored");
        }
    }
}
