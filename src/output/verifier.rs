//! Output verification implementation

use std::path::Path;

use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::output::{VerificationCheck, VerificationResult};
use crate::probe::MediaProbe;

/// Checks a freshly written artifact before it is published
pub struct ArtifactVerifier {
    require_single_audio: bool,
}

impl ArtifactVerifier {
    pub fn new(require_single_audio: bool) -> Self {
        Self {
            require_single_audio,
        }
    }

    /// Inspect `path` (bypassing any cache) and evaluate the output checks.
    ///
    /// Inspection errors propagate; failed checks are reported in the result.
    pub async fn verify(
        &self,
        probe: &MediaProbe,
        path: &Path,
        expected_duration: Option<f64>,
    ) -> Result<VerificationResult, DomainError> {
        let metadata = probe.inspect(path).await?;
        let mut checks = Vec::new();

        checks.push(VerificationCheck {
            check_type: "audio_streams".to_string(),
            details: format!(
                "expected exactly 1 audio stream, found {}",
                metadata.audio_stream_count
            ),
            success: metadata.audio_stream_count == 1,
            required: self.require_single_audio,
        });

        if let Some(expected) = expected_duration {
            let tolerance = (expected * 0.05).max(0.5);
            let drift = (metadata.duration_seconds - expected).abs();
            checks.push(VerificationCheck {
                check_type: "duration".to_string(),
                details: format!(
                    "expected {:.3}s, found {:.3}s",
                    expected, metadata.duration_seconds
                ),
                success: drift <= tolerance,
                required: false,
            });
        }

        for check in checks.iter().filter(|c| !c.success) {
            if check.required {
                debug!(path = %path.display(), check = %check.check_type, "{}", check.details);
            } else {
                warn!(path = %path.display(), check = %check.check_type, "{}", check.details);
            }
        }

        let success = checks.iter().all(|c| c.success || !c.required);
        Ok(VerificationResult {
            success,
            audio_stream_count: metadata.audio_stream_count,
            expected_duration,
            actual_duration: metadata.duration_seconds,
            checks,
        })
    }
}
