//! Composition engine: repeat, concat, stack and final audio gain

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::model::ToolInvocation;

pub mod composer;
pub mod copy;
pub mod filter;
pub mod gain;
pub mod stack;

pub use composer::CompositionEngine;
pub use copy::CopyJoiner;
pub use filter::FilterJoiner;
pub use gain::GainStage;
pub use stack::{StackAxis, StackComposer};

/// How an artifact was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// Container-level join, no re-encode
    Copy,
    /// Filter graph with explicit stream mapping
    Filter,
    /// Video copied, audio re-encoded with a volume multiplier
    AudioGain,
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionMode::Copy => f.write_str("copy"),
            CompositionMode::Filter => f.write_str("filter"),
            CompositionMode::AudioGain => f.write_str("audio_gain"),
        }
    }
}

/// One attempt made while producing an artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionAttempt {
    pub mode: CompositionMode,
    pub error: Option<String>,
}

/// A published composition artifact
#[derive(Debug, Clone, Serialize)]
pub struct CompositionOutput {
    pub path: PathBuf,
    pub mode: CompositionMode,
    /// Invocation that produced the published file
    pub invocation: ToolInvocation,
    /// Inspected duration, or the planned duration when verification is disabled
    pub duration_seconds: f64,
    /// Inspected audio stream count, `None` when verification is disabled
    pub audio_stream_count: Option<usize>,
    /// Every attempt in order; all but the last failed
    pub attempts: Vec<CompositionAttempt>,
}

impl CompositionOutput {
    /// Whether the fallback path produced this artifact
    pub fn used_fallback(&self) -> bool {
        self.attempts.len() > 1
    }
}
