//! Bootstrap readiness gate.

use super::StartTrigger;
use crate::status::{keys, StatusSink};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the gate stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Some hosts have not reported yet.
    Waiting,
    /// Every host reported success and the trigger fired.
    Opened,
    /// A host failed; the trigger will never fire.
    Failed(String),
}

/// Holds the deployment back until every bootstrap host is ready.
///
/// Each host reports once. The first failure closes the gate for good.
pub struct ReadinessGate {
    pending: Mutex<BTreeSet<String>>,
    state: Mutex<GateState>,
    trigger: StartTrigger,
    sink: Arc<dyn StatusSink>,
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Same lock order as `report`: state, then pending.
        let state = self.state.lock().clone();
        let pending = self.pending.lock().clone();
        f.debug_struct("ReadinessGate")
            .field("pending", &pending)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl ReadinessGate {
    /// Arms a gate for `hosts`. With no hosts the trigger fires at once.
    pub async fn arm(
        hosts: impl IntoIterator<Item = impl Into<String>>,
        trigger: StartTrigger,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let pending: BTreeSet<String> = hosts.into_iter().map(Into::into).collect();
        let skip = pending.is_empty();
        let gate = Self {
            pending: Mutex::new(pending),
            state: Mutex::new(GateState::Waiting),
            trigger,
            sink,
        };

        if skip {
            info!("No bootstrap hosts, starting deployment");
            *gate.state.lock() = GateState::Opened;
            gate.sink.update(keys::BOOTSTRAP_STATUS, json!("SKIPPED")).await;
            gate.trigger.fire();
        } else {
            info!(hosts = gate.pending.lock().len(), "Waiting for bootstrap hosts");
            gate.sink.update(keys::BOOTSTRAP_STATUS, json!("IN_PROGRESS")).await;
        }
        gate
    }

    /// Records the bootstrap result of one host and returns the new state.
    pub async fn report(&self, host: &str, ok: bool) -> GateState {
        let (state, changed) = {
            let mut state = self.state.lock();
            if *state != GateState::Waiting {
                debug!(host, state = ?*state, "Gate already decided, report ignored");
                return state.clone();
            }

            let mut pending = self.pending.lock();
            if !ok {
                pending.clear();
                *state = GateState::Failed(host.to_string());
                (state.clone(), true)
            } else if !pending.remove(host) {
                debug!(host, "Report from a host that is not pending");
                (state.clone(), false)
            } else if pending.is_empty() {
                *state = GateState::Opened;
                (state.clone(), true)
            } else {
                debug!(host, remaining = pending.len(), "Bootstrap host ready");
                (state.clone(), false)
            }
        };

        if changed {
            match &state {
                GateState::Opened => {
                    info!("All bootstrap hosts ready, starting deployment");
                    self.sink.update(keys::BOOTSTRAP_STATUS, json!("COMPLETED")).await;
                    self.trigger.fire();
                }
                GateState::Failed(host) => {
                    warn!(host = %host, "Bootstrap failed, deployment will not start");
                    self.sink
                        .update(keys::BOOTSTRAP_STATUS, json!(format!("FAILED:{host}")))
                        .await;
                }
                GateState::Waiting => {}
            }
        }
        state
    }

    /// Hosts that have not reported yet.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().iter().cloned().collect()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::Deployment;
    use crate::testing::{plan_of, CollectingStatusSink, RecordingDiagnostics, ScriptedRunner};

    fn launch() -> crate::deployment::DeploymentHandle {
        Deployment::launch(
            plan_of(&["prep"]),
            Arc::new(ScriptedRunner::new()),
            Arc::new(CollectingStatusSink::new()),
            Arc::new(RecordingDiagnostics::default()),
        )
    }

    #[tokio::test]
    async fn test_opens_when_all_hosts_ready() {
        let handle = launch();
        let sink = Arc::new(CollectingStatusSink::new());
        let gate = ReadinessGate::arm(["10.0.0.1", "10.0.0.2"], handle.trigger(), sink.clone()).await;

        assert_eq!(gate.report("10.0.0.1", true).await, GateState::Waiting);
        assert!(!handle.trigger().is_fired());
        assert_eq!(gate.pending(), vec!["10.0.0.2".to_string()]);

        assert_eq!(gate.report("10.0.0.2", true).await, GateState::Opened);
        assert!(handle.trigger().is_fired());
        assert_eq!(
            sink.values_of(keys::BOOTSTRAP_STATUS),
            vec![json!("IN_PROGRESS"), json!("COMPLETED")]
        );
        assert!(handle.wait().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_failure_never_fires() {
        let handle = launch();
        let sink = Arc::new(CollectingStatusSink::new());
        let gate = ReadinessGate::arm(["a", "b"], handle.trigger(), sink.clone()).await;

        assert_eq!(gate.report("a", false).await, GateState::Failed("a".to_string()));
        assert!(gate.pending().is_empty());
        assert_eq!(gate.report("b", true).await, GateState::Failed("a".to_string()));
        assert!(!handle.trigger().is_fired());
        assert_eq!(sink.last(keys::BOOTSTRAP_STATUS), Some(json!("FAILED:a")));
    }

    #[tokio::test]
    async fn test_empty_gate_skips() {
        let handle = launch();
        let sink = Arc::new(CollectingStatusSink::new());
        let gate = ReadinessGate::arm(Vec::<String>::new(), handle.trigger(), sink.clone()).await;

        assert_eq!(gate.state(), GateState::Opened);
        assert!(handle.trigger().is_fired());
        assert_eq!(sink.last(keys::BOOTSTRAP_STATUS), Some(json!("SKIPPED")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_debug_while_reporting() {
        let handle = launch();
        let hosts: Vec<String> = (0..200).map(|i| format!("host-{i}")).collect();
        let gate = Arc::new(
            ReadinessGate::arm(hosts.clone(), handle.trigger(), Arc::new(CollectingStatusSink::new())).await,
        );

        let formatter = {
            let gate = Arc::clone(&gate);
            tokio::task::spawn_blocking(move || {
                for _ in 0..200 {
                    assert!(format!("{gate:?}").contains("ReadinessGate"));
                }
            })
        };
        for host in &hosts {
            gate.report(host, true).await;
        }

        tokio::time::timeout(std::time::Duration::from_secs(10), formatter)
            .await
            .expect("formatting a gate must not block")
            .unwrap();
        assert_eq!(gate.state(), GateState::Opened);
        assert!(handle.wait().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_unknown_host_is_ignored() {
        let handle = launch();
        let gate = ReadinessGate::arm(["a"], handle.trigger(), Arc::new(CollectingStatusSink::new())).await;
        assert_eq!(gate.report("zzz", true).await, GateState::Waiting);
        assert_eq!(gate.pending(), vec!["a".to_string()]);
    }
}
