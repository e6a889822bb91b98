//! Join strategy selection

use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{FrameRate, MediaMetadata};
use crate::domain::rules::CompatibilityChecker;
use crate::planner::CompositionPlan;
use crate::streams::StreamMapper;

/// Chooses between copy-mode and filter-mode joins
pub struct CompositionPlanner {
    frame_rate_target: FrameRate,
}

impl CompositionPlanner {
    pub fn new(frame_rate_target: FrameRate) -> Self {
        Self { frame_rate_target }
    }

    pub fn frame_rate_target(&self) -> FrameRate {
        self.frame_rate_target
    }

    /// Copy plan when every input is copy-compatible with the first, filter plan otherwise
    pub fn plan_join(&self, inputs: &[MediaMetadata]) -> Result<CompositionPlan, DomainError> {
        if inputs.is_empty() {
            return Err(DomainError::BadArgs("Nothing to join".to_string()));
        }

        match CompatibilityChecker::check(inputs) {
            Ok(()) => {
                let plan = self.copy_plan(
                    inputs,
                    format!(
                        "all {} inputs share codec, resolution, frame rate and container",
                        inputs.len()
                    ),
                );
                debug!(plan = %plan, "Selected copy-mode join");
                Ok(plan)
            }
            Err(reason) => {
                let plan = self.filter_plan(inputs, reason)?;
                debug!(plan = %plan, reason = plan.reason(), "Selected filter-mode join");
                Ok(plan)
            }
        }
    }

    /// Copy plan regardless of compatibility
    pub fn copy_plan(&self, inputs: &[MediaMetadata], reason: String) -> CompositionPlan {
        CompositionPlan::Copy {
            inputs: inputs.to_vec(),
            reason,
        }
    }

    /// Filter plan with an explicit stream map, regardless of compatibility
    pub fn filter_plan(
        &self,
        inputs: &[MediaMetadata],
        reason: String,
    ) -> Result<CompositionPlan, DomainError> {
        Ok(CompositionPlan::Filter {
            inputs: inputs.to_vec(),
            frame_rate_target: self.frame_rate_target,
            stream_map: StreamMapper::for_concat(inputs)?,
            reason,
        })
    }
}
