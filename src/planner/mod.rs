//! Composition planning: copy-mode versus filter-mode joins

use std::fmt;

use serde::Serialize;

use crate::domain::model::{FrameRate, MediaMetadata};
use crate::streams::StreamMap;

pub mod strategy;

pub use strategy::CompositionPlanner;

/// How a set of inputs will be joined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositionPlan {
    /// Container-level join without re-encoding
    Copy {
        inputs: Vec<MediaMetadata>,
        reason: String,
    },
    /// Decode, normalize and re-encode through a filter graph
    Filter {
        inputs: Vec<MediaMetadata>,
        frame_rate_target: FrameRate,
        stream_map: StreamMap,
        reason: String,
    },
}

impl CompositionPlan {
    pub fn inputs(&self) -> &[MediaMetadata] {
        match self {
            CompositionPlan::Copy { inputs, .. } | CompositionPlan::Filter { inputs, .. } => inputs,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            CompositionPlan::Copy { reason, .. } | CompositionPlan::Filter { reason, .. } => reason,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, CompositionPlan::Copy { .. })
    }

    /// Explicit stream map, present on filter plans only
    pub fn stream_map(&self) -> Option<&StreamMap> {
        match self {
            CompositionPlan::Copy { .. } => None,
            CompositionPlan::Filter { stream_map, .. } => Some(stream_map),
        }
    }

    /// Sum of input durations
    pub fn expected_duration(&self) -> f64 {
        self.inputs().iter().map(|m| m.duration_seconds).sum()
    }
}

impl fmt::Display for CompositionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionPlan::Copy { inputs, .. } => write!(f, "copy({} inputs)", inputs.len()),
            CompositionPlan::Filter {
                inputs,
                frame_rate_target,
                ..
            } => write!(
                f,
                "filter({} inputs @ {} fps)",
                inputs.len(),
                frame_rate_target
            ),
        }
    }
}
