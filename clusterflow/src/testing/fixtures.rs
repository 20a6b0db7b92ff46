//! Plan fixtures.

use crate::plan::{DeploymentPlan, StageSpec};
use std::time::Duration;

/// A stage whose command is never really spawned by scripted runners.
#[must_use]
pub fn stage(id: &str) -> StageSpec {
    StageSpec::new(id, "true").with_timeout(Duration::from_secs(5))
}

/// Builds a plan of placeholder stages with the given ids, in order.
///
/// # Panics
///
/// Panics if the ids are empty or repeat.
#[must_use]
pub fn plan_of(ids: &[&str]) -> DeploymentPlan {
    DeploymentPlan::new(ids.iter().map(|id| stage(id)).collect())
        .unwrap_or_else(|e| panic!("invalid fixture plan {ids:?}: {e}"))
}
