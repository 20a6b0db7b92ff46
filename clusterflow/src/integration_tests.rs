//! End-to-end tests of launched deployments.

#[cfg(test)]
mod tests {
    use crate::core::{DeploymentPhase, ExecutionResult, Outcome, StageId, StageStatus};
    use crate::deployment::{Deployment, DeploymentHandle};
    use crate::orchestrator::{COMPLETED_MARKER, FAILED_MARKER};
    use crate::plan::{DeploymentPlan, StageSpec};
    use crate::runner::{CommandRunner, ProcessRunner};
    use crate::status::{keys, StatusStore};
    use crate::testing::{
        assert_stage_statuses, plan_of, CollectingStatusSink, FailingDiagnostics, RecordingDiagnostics,
        ScriptedRunner,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        handle: DeploymentHandle,
        runner: Arc<ScriptedRunner>,
        sink: Arc<CollectingStatusSink>,
        diagnostics: Arc<RecordingDiagnostics>,
    }

    fn launch(ids: &[&str], runner: ScriptedRunner) -> Harness {
        let runner = Arc::new(runner);
        let sink = Arc::new(CollectingStatusSink::new());
        let diagnostics = Arc::new(RecordingDiagnostics::new("/var/log/clusterflow/diag.txt"));
        let handle = Deployment::launch(plan_of(ids), runner.clone(), sink.clone(), diagnostics.clone());
        Harness {
            handle,
            runner,
            sink,
            diagnostics,
        }
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let h = launch(&["prep", "install", "init"], ScriptedRunner::new());
        assert!(h.handle.start());
        let report = h.handle.wait().await.unwrap();

        assert_eq!(report.phase, DeploymentPhase::Completed);
        assert!(report.records.iter().all(|r| r.status == StageStatus::Succeeded));
        assert_eq!(report.records[2].last_message, "init ok");
        assert_eq!(
            h.runner.calls(),
            vec![StageId::new("prep"), StageId::new("install"), StageId::new("init")]
        );

        assert_eq!(
            h.sink.values_of(keys::ANSIBLE_STAGE),
            vec![json!("prep"), json!("install"), json!("init"), json!(COMPLETED_MARKER)]
        );
        assert_eq!(
            h.sink.values_of(keys::CLUSTER_STATUS),
            vec![json!("DEPLOYING"), json!("DEPLOYED")]
        );
        assert_eq!(
            h.sink.last(keys::STAGE_SUMMARY),
            Some(json!({"prep": "SUCCEEDED", "install": "SUCCEEDED", "init": "SUCCEEDED"}))
        );
        assert_eq!(h.sink.last(keys::DEPLOYMENT_PHASE), Some(json!("COMPLETED")));
        assert!(h.sink.alerts().is_empty());
        assert!(h.diagnostics.collected().is_empty());
    }

    #[tokio::test]
    async fn test_install_failure_aborts_init() {
        let runner = ScriptedRunner::new().with_result(
            "install",
            ExecutionResult::failed(Outcome::ExecutionError, 1, "fatal: [cp1]: FAILED!"),
        );
        let h = launch(&["prep", "install", "init"], runner);
        h.handle.start();
        let report = h.handle.wait().await.unwrap();

        assert_eq!(report.phase, DeploymentPhase::Failed);
        assert_eq!(
            report.records.iter().map(|r| r.status).collect::<Vec<_>>(),
            vec![StageStatus::Succeeded, StageStatus::Failed, StageStatus::Aborted]
        );
        assert_eq!(report.failed_stage().map(|r| r.stage_id.as_str()), Some("install"));
        assert!(report.records[1].last_message.starts_with("EXECUTION_ERROR: exit code 1"));
        assert_eq!(h.runner.call_count("init"), 0);

        let alerts = h.sink.alerts();
        assert_eq!(alerts, vec!["ALERT: Execution failed in install: EXECUTION_ERROR".to_string()]);
        assert!(alerts[0].contains("install"));
        assert_eq!(h.sink.last(keys::ANSIBLE_STAGE), Some(json!(FAILED_MARKER)));
        assert_eq!(h.sink.last(keys::CLUSTER_STATUS), Some(json!("FAILED")));
        assert_eq!(
            h.sink.last(keys::DIAGNOSTIC_LOGS),
            Some(json!("/var/log/clusterflow/diag.txt"))
        );
        assert_eq!(h.diagnostics.collected(), vec![StageId::new("install")]);
    }

    #[tokio::test]
    async fn test_first_stage_failure_aborts_every_other_stage() {
        let runner = ScriptedRunner::new().with_result("a", ExecutionResult::timeout("Timed out after 1s"));
        let h = launch(&["a", "b", "c", "d"], runner);
        h.handle.start();
        let report = h.handle.wait().await.unwrap();

        assert_eq!(report.phase, DeploymentPhase::Failed);
        assert_eq!(
            report.stage_summary().into_values().collect::<Vec<_>>(),
            vec![
                StageStatus::Failed,
                StageStatus::Aborted,
                StageStatus::Aborted,
                StageStatus::Aborted,
            ]
        );
        assert_eq!(h.runner.calls(), vec![StageId::new("a")]);
        assert_eq!(
            h.sink.alerts(),
            vec!["ALERT: TIMEOUT in a. Check network or increase timeout.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_last_stage_failure_has_nothing_to_abort() {
        let runner = ScriptedRunner::new().with_result(
            "join",
            ExecutionResult::failed(Outcome::ConnectionFailure, 4, "w1 | UNREACHABLE!"),
        );
        let h = launch(&["prep", "join"], runner);
        h.handle.start();
        let report = h.handle.wait().await.unwrap();

        assert_eq!(report.phase, DeploymentPhase::Failed);
        assert_eq!(report.records[0].status, StageStatus::Succeeded);
        assert_eq!(report.records[1].status, StageStatus::Failed);
        assert_eq!(
            h.sink.alerts(),
            vec!["ALERT: UNREACHABLE NODE during join. Verify inventory and SSH keys.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_diagnostics_failure_is_not_fatal() {
        let runner = ScriptedRunner::new().with_result("a", ExecutionResult::exception("spawn failed"));
        let sink = Arc::new(CollectingStatusSink::new());
        let handle = Deployment::launch(
            plan_of(&["a", "b"]),
            Arc::new(runner),
            sink.clone(),
            Arc::new(FailingDiagnostics),
        );
        handle.start();
        let report = handle.wait().await.unwrap();

        assert_eq!(report.phase, DeploymentPhase::Failed);
        assert_eq!(sink.last(keys::DIAGNOSTIC_LOGS), Some(json!("")));
    }

    #[tokio::test]
    async fn test_snapshots_track_progress() {
        let runner = ScriptedRunner::new().with_delay("slow", Duration::from_millis(200));
        let h = launch(&["fast", "slow"], runner);
        let mut updates = h.handle.subscribe();
        h.handle.start();

        let running = updates
            .wait_for(|s| s.status_of("slow") == Some(StageStatus::Running))
            .await
            .unwrap()
            .clone();
        assert_eq!(running.state.phase, DeploymentPhase::Running);
        assert_eq!(running.state.current_index, 1);
        assert_stage_statuses(&running, &[StageStatus::Succeeded, StageStatus::Running]);

        let report = h.handle.wait().await.unwrap();
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_status_store_as_sink() {
        let store = Arc::new(StatusStore::new());
        let runner = ScriptedRunner::new().with_result(
            "calico",
            ExecutionResult::failed(Outcome::ExecutionError, 2, "boom"),
        );
        let handle = Deployment::launch(
            plan_of(&["containerd", "calico", "worker-join"]),
            Arc::new(runner),
            store.clone(),
            Arc::new(RecordingDiagnostics::new("diag.txt")),
        );
        handle.start();
        handle.wait().await.unwrap();

        assert_eq!(store.get(keys::CLUSTER_STATUS), Some(json!("FAILED")));
        assert_eq!(store.get(keys::DIAGNOSTIC_LOGS), Some(json!("diag.txt")));
        assert_eq!(
            store.get(keys::STAGE_SUMMARY),
            Some(json!({"containerd": "SUCCEEDED", "calico": "FAILED", "worker-join": "ABORTED"}))
        );
        assert_eq!(
            store.alerts(),
            vec!["ALERT: Execution failed in calico: EXECUTION_ERROR".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_processes() {
        let dir = tempfile::tempdir().unwrap();
        let plan = DeploymentPlan::new(vec![
            StageSpec::new("write", "sh")
                .with_args(["-c", "echo token=abc; echo done > marker"])
                .with_working_dir(dir.path())
                .with_timeout(Duration::from_secs(10)),
            StageSpec::new("check", "sh")
                .with_args(["-c", "test -f marker"])
                .with_working_dir(dir.path())
                .with_timeout(Duration::from_secs(10)),
            StageSpec::new("break", "sh")
                .with_args(["-c", "echo 'Failed to connect to host' >&2; exit 2"])
                .with_working_dir(dir.path())
                .with_timeout(Duration::from_secs(10)),
            StageSpec::new("never", "sh")
                .with_args(["-c", "touch never-ran"])
                .with_working_dir(dir.path())
                .with_timeout(Duration::from_secs(10)),
        ])
        .unwrap();

        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
        let sink = Arc::new(CollectingStatusSink::new());
        let handle = Deployment::launch(plan, runner, sink.clone(), Arc::new(RecordingDiagnostics::default()));
        handle.start();
        let report = handle.wait().await.unwrap();

        assert_eq!(
            report.records.iter().map(|r| r.status).collect::<Vec<_>>(),
            vec![
                StageStatus::Succeeded,
                StageStatus::Succeeded,
                StageStatus::Failed,
                StageStatus::Aborted,
            ]
        );
        assert_eq!(report.records[0].last_message, "token=***MASKED***\n");
        assert!(report.records[2].last_message.starts_with("CONNECTION_FAILURE: exit code 2"));
        assert!(!dir.path().join("never-ran").exists());
        assert_eq!(
            sink.alerts(),
            vec!["ALERT: UNREACHABLE NODE during break. Verify inventory and SSH keys.".to_string()]
        );
    }
}
