//! The deployment orchestrator.
//!
//! [`DeploymentMachine`] holds the transition logic; [`Orchestrator`] is
//! the actor that feeds it messages and carries out its effects.

mod actor;
mod alerts;
mod machine;

pub use actor::{Orchestrator, COMPLETED_MARKER, FAILED_MARKER};
pub use alerts::alert_for;
pub use machine::{DeploymentMachine, Effect};
