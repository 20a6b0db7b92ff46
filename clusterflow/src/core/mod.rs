//! Core domain model types for clusterflow.
//!
//! This module contains the data shared by every actor:
//! - Stage and deployment status enums
//! - Classified results of external command runs
//! - Per-stage records and the deployment state snapshot

mod id;
mod outcome;
mod record;
mod status;

pub use id::StageId;
pub use outcome::{ExecutionResult, Outcome};
pub use record::{DeploymentSnapshot, DeploymentState, StageRecord};
pub use status::{DeploymentPhase, StageStatus};
