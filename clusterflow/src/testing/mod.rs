//! Testing utilities for clusterflow deployments.
//!
//! This module provides:
//! - A scripted command runner and a recording diagnostic collector
//! - Plan fixtures
//! - Assertions over deployment snapshots

mod assertions;
mod fixtures;
mod mocks;

pub use crate::status::CollectingStatusSink;
pub use assertions::{assert_phase, assert_stage_status, assert_stage_statuses};
pub use fixtures::{plan_of, stage};
pub use mocks::{FailingDiagnostics, RecordingDiagnostics, ScriptedRunner};
