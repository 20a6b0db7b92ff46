//! Plan builder with validation.

use super::StageSpec;
use crate::core::StageId;
use crate::errors::PlanValidationError;
use std::collections::HashSet;

/// An ordered, immutable, validated sequence of stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    stages: Vec<StageSpec>,
}

impl DeploymentPlan {
    /// Builds a plan from stage specs in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, an id repeats, or a stage
    /// fails its own validation.
    pub fn new(stages: Vec<StageSpec>) -> Result<Self, PlanValidationError> {
        if stages.is_empty() {
            return Err(PlanValidationError::empty());
        }

        let mut seen = HashSet::with_capacity(stages.len());
        for spec in &stages {
            spec.validate()?;
            if !seen.insert(spec.id.as_str()) {
                return Err(PlanValidationError::duplicate(spec.id.as_str()));
            }
        }

        Ok(Self { stages })
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: a plan holds at least one stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StageSpec> {
        self.stages.get(index)
    }

    /// Returns the position of a stage in the plan.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id.as_str() == id)
    }

    /// Iterates over the stages in order.
    pub fn iter(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.iter()
    }

    /// Returns the stage ids in order.
    #[must_use]
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id.clone()).collect()
    }
}

impl IntoIterator for DeploymentPlan {
    type Item = StageSpec;
    type IntoIter = std::vec::IntoIter<StageSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.into_iter()
    }
}

/// Incremental builder for [`DeploymentPlan`].
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    stages: Vec<StageSpec>,
}

impl PlanBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is invalid or its id is already used.
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PlanValidationError> {
        spec.validate()?;
        if self.stages.iter().any(|s| s.id == spec.id) {
            return Err(PlanValidationError::duplicate(spec.id.as_str()));
        }
        self.stages.push(spec);
        Ok(self)
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Finishes the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if no stage was added.
    pub fn build(self) -> Result<DeploymentPlan, PlanValidationError> {
        DeploymentPlan::new(self.stages)
    }
}
