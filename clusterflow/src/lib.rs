//! # Clusterflow
//!
//! Actor-driven orchestration of ordered cluster provisioning stages.
//!
//! A deployment is a fixed, ordered plan of stages, each running one
//! external command (normally an `ansible-playbook` invocation). Clusterflow
//! provides:
//!
//! - **Stage executors**: one actor per stage, running its command on a worker task
//! - **An orchestrator**: a single-writer state machine that starts stages in
//!   order, fails fast on the first failure and aborts the rest
//! - **A process runner**: merged output, secret redaction, hard timeouts and
//!   outcome classification
//! - **Status reporting**: a process-wide status store with alerts and
//!   diagnostics locations for operators
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clusterflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = DeploymentConfig::default()
//!     .with_inventory("inventory.ini")
//!     .with_playbooks_dir("scripts");
//! let plan = build_plan(&config)?;
//!
//! let handle = Deployment::launch(
//!     plan,
//!     Arc::new(ProcessRunner::new()),
//!     global_status_store(),
//!     Arc::new(CommandDiagnosticCollector::new(&config.diagnostics_path)),
//! );
//! handle.start();
//! let report = handle.wait().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod deployment;
pub mod diagnostics;
pub mod errors;
pub mod executor;
pub mod messaging;
pub mod observability;
pub mod orchestrator;
pub mod plan;
pub mod runner;
pub mod status;
pub mod testing;
pub mod utils;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::DeploymentConfig;
    pub use crate::core::{
        DeploymentPhase, DeploymentSnapshot, DeploymentState, ExecutionResult, Outcome, StageId,
        StageRecord, StageStatus,
    };
    pub use crate::deployment::{Deployment, DeploymentHandle, DeploymentReport, ReadinessGate, StartTrigger};
    pub use crate::diagnostics::{CommandDiagnosticCollector, DiagnosticCollector};
    pub use crate::errors::{ClusterflowError, ConfigError, PlanValidationError, Result};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::plan::{build_plan, DeploymentPlan, PlanBuilder, StageSpec};
    pub use crate::runner::{CommandRunner, ProcessRunner};
    pub use crate::status::{global_status_store, LoggingStatusSink, StatusSink, StatusStore};
}
