//! Composition orchestration
//!
//! Joins run as a small state machine: uniform inputs start with a copy-mode
//! join and fall back to a filter-mode join; non-uniform inputs start with the
//! filter-mode join and retry once in copy mode. When both attempts fail the
//! error carries both messages.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::domain::config::CompositionSettings;
use crate::domain::errors::DomainError;
use crate::domain::model::{FrameRate, MediaMetadata, ToolInvocation};
use crate::engine::{
    CompositionAttempt, CompositionMode, CompositionOutput, CopyJoiner, FilterJoiner, GainStage,
    StackAxis, StackComposer,
};
use crate::output::{ArtifactVerifier, StagedOutput};
use crate::planner::{CompositionPlan, CompositionPlanner};
use crate::ports::MediaToolPort;
use crate::probe::ProbeCache;

enum JoinState {
    CopyJoin { primary_error: Option<String> },
    FilterJoin { primary_error: Option<String> },
    Done(CompositionOutput),
    Fatal { primary: String, fallback: String },
}

/// Repeat, concat, stack and gain operations over probed inputs
pub struct CompositionEngine {
    tool: Arc<dyn MediaToolPort>,
    cache: Arc<ProbeCache>,
    planner: CompositionPlanner,
    verifier: ArtifactVerifier,
    verify_outputs: bool,
    default_gain: f64,
}

impl CompositionEngine {
    pub fn new(
        tool: Arc<dyn MediaToolPort>,
        cache: Arc<ProbeCache>,
        settings: &CompositionSettings,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            tool,
            cache,
            planner: CompositionPlanner::new(FrameRate::from_integer(settings.target_frame_rate)?),
            verifier: ArtifactVerifier::new(true),
            verify_outputs: settings.verify_audio,
            default_gain: settings.audio_gain,
        })
    }

    pub fn default_gain(&self) -> f64 {
        self.default_gain
    }

    /// Probe every input through the cache; the first failure aborts
    pub async fn probe_inputs(&self, inputs: &[PathBuf]) -> Result<Vec<MediaMetadata>, DomainError> {
        let mut metadata = Vec::with_capacity(inputs.len());
        for input in inputs {
            metadata.push(self.cache.get(input).await?);
        }
        Ok(metadata)
    }

    /// Plan a join without running it
    pub async fn plan_concat(&self, inputs: &[PathBuf]) -> Result<CompositionPlan, DomainError> {
        if inputs.is_empty() {
            return Err(DomainError::BadArgs("Nothing to join".to_string()));
        }
        let metadata = self.probe_inputs(inputs).await?;
        self.planner.plan_join(&metadata)
    }

    /// Join `inputs` back to back into `output`
    pub async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let plan = self.plan_concat(inputs).await?;
        info!(
            "Joining {} inputs into {} ({})",
            inputs.len(),
            output.display(),
            plan
        );
        self.join(plan, output).await
    }

    /// `count` back-to-back copies of `input`
    pub async fn repeat(
        &self,
        input: &Path,
        count: usize,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        if count == 0 {
            return Err(DomainError::BadArgs(
                "Repeat count must be at least 1".to_string(),
            ));
        }
        let metadata = self.cache.get(input).await?;
        let plan = self.planner.plan_join(&vec![metadata; count])?;
        info!(
            "Repeating {} x{} into {} ({})",
            input.display(),
            count,
            output.display(),
            plan
        );
        self.join(plan, output).await
    }

    pub async fn hstack(
        &self,
        primary: &Path,
        secondary: &Path,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        self.stack(StackAxis::Horizontal, primary, secondary, output)
            .await
    }

    pub async fn vstack(
        &self,
        primary: &Path,
        secondary: &Path,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        self.stack(StackAxis::Vertical, primary, secondary, output)
            .await
    }

    /// Stack `secondary` next to or below `primary`; audio follows the primary
    pub async fn stack(
        &self,
        axis: StackAxis,
        primary: &Path,
        secondary: &Path,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let primary_meta = self.cache.get(primary).await?;
        let secondary_meta = self.cache.get(secondary).await?;
        let expected = primary_meta
            .duration_seconds
            .max(secondary_meta.duration_seconds);

        info!(
            "Stacking ({}) {} with {} into {}",
            axis,
            primary.display(),
            secondary.display(),
            output.display()
        );

        let result = self
            .execute(CompositionMode::Filter, expected, output, |staged| {
                StackComposer::invocation(axis, &primary_meta, &secondary_meta, staged)
                    .map(|(invocation, _)| invocation)
            })
            .await;

        match result {
            Ok(mut artifact) => {
                artifact.attempts.push(CompositionAttempt {
                    mode: CompositionMode::Filter,
                    error: None,
                });
                Ok(artifact)
            }
            Err(err) => {
                error!("{} of {} failed: {}", axis, primary.display(), err);
                Err(err)
            }
        }
    }

    /// Terminal pass amplifying the audio of `input`; `None` uses the configured factor
    pub async fn apply_final_audio_gain(
        &self,
        input: &Path,
        factor: Option<f64>,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let factor = factor.unwrap_or(self.default_gain);
        let metadata = self.cache.get(input).await?;
        info!(
            "Applying audio gain x{} to {} into {}",
            factor,
            input.display(),
            output.display()
        );

        let mut artifact = self
            .execute(
                CompositionMode::AudioGain,
                metadata.duration_seconds,
                output,
                |staged| GainStage::invocation(&metadata, factor, staged),
            )
            .await?;
        artifact.attempts.push(CompositionAttempt {
            mode: CompositionMode::AudioGain,
            error: None,
        });
        Ok(artifact)
    }

    async fn join(
        &self,
        plan: CompositionPlan,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let started = Instant::now();
        let inputs = plan.inputs().to_vec();
        let expected = plan.expected_duration();
        let mut attempts = Vec::new();

        let mut state = if plan.is_copy() {
            JoinState::CopyJoin {
                primary_error: None,
            }
        } else {
            JoinState::FilterJoin {
                primary_error: None,
            }
        };

        loop {
            state = match state {
                JoinState::CopyJoin { primary_error } => {
                    let result = self.attempt_copy(&inputs, expected, output).await;
                    Self::advance(
                        &mut attempts,
                        CompositionMode::Copy,
                        result,
                        primary_error,
                        |primary| JoinState::FilterJoin {
                            primary_error: Some(primary),
                        },
                    )?
                }
                JoinState::FilterJoin { primary_error } => {
                    let result = self.attempt_filter(&plan, &inputs, expected, output).await;
                    Self::advance(
                        &mut attempts,
                        CompositionMode::Filter,
                        result,
                        primary_error,
                        |primary| JoinState::CopyJoin {
                            primary_error: Some(primary),
                        },
                    )?
                }
                JoinState::Done(mut artifact) => {
                    artifact.attempts = attempts;
                    info!(
                        path = %artifact.path.display(),
                        mode = %artifact.mode,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Join completed, output duration {:.3}s",
                        artifact.duration_seconds
                    );
                    return Ok(artifact);
                }
                JoinState::Fatal { primary, fallback } => {
                    error!(path = %output.display(), "Join failed on both paths");
                    return Err(DomainError::CompositionFatal { primary, fallback });
                }
            };
        }
    }

    fn advance(
        attempts: &mut Vec<CompositionAttempt>,
        mode: CompositionMode,
        result: Result<CompositionOutput, DomainError>,
        primary_error: Option<String>,
        fallback: impl FnOnce(String) -> JoinState,
    ) -> Result<JoinState, DomainError> {
        let err = match result {
            Ok(artifact) => {
                attempts.push(CompositionAttempt { mode, error: None });
                return Ok(JoinState::Done(artifact));
            }
            Err(err) => err,
        };

        attempts.push(CompositionAttempt {
            mode,
            error: Some(err.to_string()),
        });

        match primary_error {
            Some(primary) => Ok(JoinState::Fatal {
                primary,
                fallback: err.to_string(),
            }),
            None if err.is_recoverable() || err.is_probe_error() => {
                warn!(attempt = %mode, "Join attempt failed, falling back: {}", err);
                Ok(fallback(err.to_string()))
            }
            None => Err(err),
        }
    }

    async fn attempt_copy(
        &self,
        inputs: &[MediaMetadata],
        expected: f64,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let list = CopyJoiner::write_list(inputs)?;
        self.execute(CompositionMode::Copy, expected, output, |staged| {
            Ok(CopyJoiner::invocation(list.path(), inputs, staged))
        })
        .await
    }

    async fn attempt_filter(
        &self,
        plan: &CompositionPlan,
        inputs: &[MediaMetadata],
        expected: f64,
        output: &Path,
    ) -> Result<CompositionOutput, DomainError> {
        let fallback_plan;
        let filter_plan = if plan.is_copy() {
            fallback_plan = self
                .planner
                .filter_plan(inputs, "copy-mode join failed".to_string())?;
            &fallback_plan
        } else {
            plan
        };

        self.execute(CompositionMode::Filter, expected, output, |staged| {
            FilterJoiner::invocation(filter_plan, staged)
        })
        .await
    }

    /// Run one invocation into a staged file, verify it, then publish it
    async fn execute(
        &self,
        mode: CompositionMode,
        expected_duration: f64,
        output: &Path,
        build: impl FnOnce(&Path) -> Result<ToolInvocation, DomainError>,
    ) -> Result<CompositionOutput, DomainError> {
        let staged = StagedOutput::create(output)?;
        let invocation = build(staged.path())?;
        debug!(mode = %mode, args = ?invocation.to_command_args(), "Running composition");

        self.tool.run(&invocation).await?.into_result("ffmpeg")?;

        let (duration_seconds, audio_stream_count) = if self.verify_outputs {
            let report = self
                .verifier
                .verify(self.cache.probe(), staged.path(), Some(expected_duration))
                .await?;
            if !report.success {
                return Err(DomainError::CompositionIncompatible(format!(
                    "{} output failed verification: {}",
                    mode,
                    report.failure_summary()
                )));
            }
            (report.actual_duration, Some(report.audio_stream_count))
        } else {
            (expected_duration, None)
        };

        let path = staged.commit()?;
        Ok(CompositionOutput {
            path,
            mode,
            invocation,
            duration_seconds,
            audio_stream_count,
            attempts: Vec::new(),
        })
    }
}
