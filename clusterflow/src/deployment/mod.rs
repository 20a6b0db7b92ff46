//! Launching and supervising deployment runs.
//!
//! [`Deployment::launch`] wires one executor per stage to a fresh
//! orchestrator and hands back a [`DeploymentHandle`]. The run waits for
//! its readiness trigger, fired directly through the handle or by a
//! [`ReadinessGate`] once every bootstrap host has reported in.

mod launcher;
mod readiness;
mod report;

pub use launcher::{Deployment, DeploymentHandle, StartTrigger};
pub use readiness::{GateState, ReadinessGate};
pub use report::DeploymentReport;
