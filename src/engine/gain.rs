//! Terminal audio gain pass: video copied, audio alone re-encoded

use std::path::Path;

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeArgs, InputSpec, MediaMetadata, ToolInvocation};

pub struct GainStage;

impl GainStage {
    pub fn invocation(
        input: &MediaMetadata,
        factor: f64,
        output: &Path,
    ) -> Result<ToolInvocation, DomainError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Gain factor must be positive, got {}",
                factor
            )));
        }
        if !input.has_audio() {
            return Err(DomainError::BadArgs(format!(
                "No audio stream to amplify in {}",
                input.path.display()
            )));
        }

        let mut args = EncodeArgs::new();
        if input.has_video() {
            args = args.opt("-map", "0:v:0").opt("-c:v", "copy");
        }
        args = args
            .opt("-map", "0:a:0")
            .opt("-af", format!("volume={}", factor))
            .opt("-c:a", "aac")
            .opt("-b:a", "192k");

        Ok(ToolInvocation::new(
            vec![InputSpec::file(&input.path)],
            args,
            output,
        ))
    }
}
