//! Side-by-side and top-bottom stacking

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeArgs, InputSpec, MediaMetadata, ToolInvocation};
use crate::domain::rules::{EncodeArgPlanner, NORMALIZED_AUDIO_SAMPLE_RATE};
use crate::engine::filter::silence_chain;
use crate::streams::{StreamKind, StreamMap, StreamMapper, StreamSource};

/// Stacking axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackAxis {
    /// Secondary placed right of the primary, scaled to its height
    Horizontal,
    /// Secondary placed below the primary, scaled to its width
    Vertical,
}

impl fmt::Display for StackAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackAxis::Horizontal => f.write_str("hstack"),
            StackAxis::Vertical => f.write_str("vstack"),
        }
    }
}

pub struct StackComposer;

impl StackComposer {
    pub fn invocation(
        axis: StackAxis,
        primary: &MediaMetadata,
        secondary: &MediaMetadata,
        output: &Path,
    ) -> Result<(ToolInvocation, StreamMap), DomainError> {
        let map = StreamMapper::for_stack(primary, secondary)?;
        let graph = Self::filter_graph(axis, primary, &map)?;

        let args = EncodeArgs::new()
            .opt("-filter_complex", graph)
            .extend(map.map_args())
            .extend(EncodeArgPlanner::video_encode_args(primary.video.as_ref(), true))
            .extend(EncodeArgPlanner::audio_args(true));

        let invocation = ToolInvocation::new(
            vec![InputSpec::file(&primary.path), InputSpec::file(&secondary.path)],
            args,
            output,
        );
        Ok((invocation, map))
    }

    pub fn filter_graph(
        axis: StackAxis,
        primary: &MediaMetadata,
        map: &StreamMap,
    ) -> Result<String, DomainError> {
        let Some(video) = primary.video.as_ref() else {
            return Err(DomainError::BadArgs(
                "Stack primary input has no video stream".to_string(),
            ));
        };

        // -2 keeps the aspect ratio with an even dimension
        let secondary_scale = match axis {
            StackAxis::Horizontal => format!("scale=-2:{}", video.height),
            StackAxis::Vertical => format!("scale={}:-2", video.width),
        };

        let mut chains = vec![
            "[0:v:0]setsar=1,format=yuv420p[v0]".to_string(),
            format!("[1:v:0]{},setsar=1,format=yuv420p[v1]", secondary_scale),
            format!("[v0][v1]{}=inputs=2[outv]", axis),
        ];

        let audio_out = map.output_label(StreamKind::Audio).unwrap_or("outa");
        if let Some(audio) = map.sources_of(StreamKind::Audio).next() {
            chains.push(match &audio.source {
                StreamSource::Input { .. } => format!(
                    "[{}]aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo[{}]",
                    audio.specifier().unwrap_or_default(),
                    NORMALIZED_AUDIO_SAMPLE_RATE,
                    audio_out
                ),
                StreamSource::Generated {
                    duration_seconds, ..
                } => silence_chain(*duration_seconds, audio_out),
            });
        }

        Ok(chains.join(";"))
    }
}
