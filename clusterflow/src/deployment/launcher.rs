//! Wiring actors together for one run.

use super::DeploymentReport;
use crate::core::{DeploymentSnapshot, StageId};
use crate::diagnostics::DiagnosticCollector;
use crate::errors::{ClusterflowError, Result};
use crate::executor::{spawn_executor, ExecutorState};
use crate::messaging::mailbox;
use crate::observability::SpanTimer;
use crate::orchestrator::Orchestrator;
use crate::plan::DeploymentPlan;
use crate::runner::CommandRunner;
use crate::status::StatusSink;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Fires the readiness trigger of one run. Cheap to clone; only the first
/// [`fire`](Self::fire) across all clones has an effect.
#[derive(Debug, Clone)]
pub struct StartTrigger {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl StartTrigger {
    fn new(sender: oneshot::Sender<()>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Starts the run. Returns false if it was already started or the
    /// orchestrator is gone.
    pub fn fire(&self) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            info!("Deployment already started");
            return false;
        };
        sender.send(()).is_ok()
    }

    /// True once the trigger has been fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Entry point for launching deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deployment;

impl Deployment {
    /// Spawns one executor per stage and the orchestrator.
    ///
    /// Nothing runs until [`DeploymentHandle::start`] or a clone of
    /// [`DeploymentHandle::trigger`] fires. Must be called within a tokio
    /// runtime.
    #[must_use]
    pub fn launch(
        plan: DeploymentPlan,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn StatusSink>,
        diagnostics: Arc<dyn DiagnosticCollector>,
    ) -> DeploymentHandle {
        let run_id = crate::utils::generate_run_id();
        let span = info_span!("deployment", run_id = %run_id);
        let timer = SpanTimer::start(run_id.to_string());

        let (orchestrator_address, orchestrator_inbox) = mailbox("orchestrator");
        let mut addresses: Vec<(StageId, _)> = Vec::with_capacity(plan.len());
        let mut executors = Vec::with_capacity(plan.len());
        for spec in plan.iter().cloned() {
            let id = spec.id.clone();
            let (address, handle) = spawn_executor(spec, Arc::clone(&runner), orchestrator_address.clone());
            addresses.push((id, address));
            executors.push(handle);
        }
        drop(orchestrator_address);

        let orchestrator = Orchestrator::new(run_id, &plan, addresses, sink, diagnostics);
        let snapshots = orchestrator.subscribe();
        let (trigger_tx, trigger_rx) = oneshot::channel();
        let orchestrator = tokio::spawn(
            orchestrator
                .run(orchestrator_inbox, trigger_rx)
                .instrument(span),
        );
        info!(run_id = %run_id, stages = plan.len(), "Deployment launched");

        DeploymentHandle {
            run_id,
            trigger: StartTrigger::new(trigger_tx),
            snapshots,
            orchestrator,
            executors,
            timer,
        }
    }
}

/// Control surface of one launched run.
#[derive(Debug)]
pub struct DeploymentHandle {
    run_id: Uuid,
    trigger: StartTrigger,
    snapshots: watch::Receiver<DeploymentSnapshot>,
    orchestrator: JoinHandle<DeploymentSnapshot>,
    executors: Vec<JoinHandle<ExecutorState>>,
    timer: SpanTimer,
}

impl DeploymentHandle {
    /// Correlation id of the run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Fires the readiness trigger. A second call is a no-op returning false.
    pub fn start(&self) -> bool {
        self.trigger.fire()
    }

    /// Returns a trigger that can start the run from elsewhere.
    #[must_use]
    pub fn trigger(&self) -> StartTrigger {
        self.trigger.clone()
    }

    /// Copy of the latest published state.
    #[must_use]
    pub fn snapshot(&self) -> DeploymentSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeploymentSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for the run to settle and every actor to exit.
    ///
    /// If no trigger clone is left unfired, the run ends without starting.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor task panicked.
    pub async fn wait(self) -> Result<DeploymentReport> {
        let Self {
            trigger,
            orchestrator,
            executors,
            timer,
            ..
        } = self;
        drop(trigger);

        let snapshot = orchestrator
            .await
            .map_err(|e| ClusterflowError::ActorFailed(format!("orchestrator: {e}")))?;
        for joined in join_all(executors).await {
            joined.map_err(|e| ClusterflowError::ActorFailed(format!("executor: {e}")))?;
        }

        let report = DeploymentReport::from_snapshot(snapshot, timer.finish());
        info!(
            run_id = %report.run_id,
            phase = %report.phase,
            duration_ms = report.duration_ms,
            "Deployment finished"
        );
        Ok(report)
    }
}
