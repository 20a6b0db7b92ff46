//! Deployment plans: the fixed, ordered list of stages for one run.
//!
//! A plan is built once, validated, and never reordered. Each entry carries
//! the command its executor will run.

mod builder;
mod catalogue;
mod spec;

pub use builder::{DeploymentPlan, PlanBuilder};
pub use catalogue::{
    build_plan, playbook_env, selected_entries, CatalogueEntry, ANSIBLE_PLAYBOOK, STANDARD_CATALOGUE,
};
pub use spec::StageSpec;
