//! Well-known status keys.

/// Current stage id, or a final marker once the run ends.
pub const ANSIBLE_STAGE: &str = "ansibleStage";
/// Coarse cluster state: `NOT_DEPLOYED`, `DEPLOYING`, `DEPLOYED`, `FAILED`.
pub const CLUSTER_STATUS: &str = "clusterStatus";
/// Phase of the deployment state machine.
pub const DEPLOYMENT_PHASE: &str = "deploymentPhase";
/// Array of operator alerts.
pub const ALERTS: &str = "alerts";
/// Location of collected diagnostics, or an empty string.
pub const DIAGNOSTIC_LOGS: &str = "diagnosticLogs";
/// Milliseconds since the epoch of the last update.
pub const LAST_UPDATE: &str = "lastUpdate";
/// Nodes known to the cluster.
pub const ACTIVE_NODES: &str = "activeNodes";
/// Object mapping stage id to final status.
pub const STAGE_SUMMARY: &str = "stageSummary";
/// Progress of the bootstrap phase before the deployment starts.
pub const BOOTSTRAP_STATUS: &str = "bootstrapStatus";
