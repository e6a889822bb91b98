//! Staged artifact writing and post-write verification

use serde::{Deserialize, Serialize};

pub mod verifier;
pub mod writer;

pub use verifier::ArtifactVerifier;
pub use writer::StagedOutput;

/// Output verification result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// All required checks passed
    pub success: bool,
    pub audio_stream_count: usize,
    pub expected_duration: Option<f64>,
    pub actual_duration: f64,
    pub checks: Vec<VerificationCheck>,
}

impl VerificationResult {
    /// Details of every failed required check, joined
    pub fn failure_summary(&self) -> String {
        self.checks
            .iter()
            .filter(|c| c.required && !c.success)
            .map(|c| format!("{}: {}", c.check_type, c.details))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Individual verification check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub check_type: String,
    pub details: String,
    pub success: bool,
    /// Failing a non-required check is only reported
    pub required: bool,
}
