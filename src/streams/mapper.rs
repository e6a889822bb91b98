//! Stream mapping utilities

use std::collections::HashSet;

use crate::domain::errors::DomainError;
use crate::domain::model::MediaMetadata;
use crate::streams::{OutputStream, SourceStream, StreamKind, StreamMap, StreamSource};

/// Output label of the joined video stream
pub const VIDEO_OUTPUT_LABEL: &str = "outv";

/// Output label of the joined audio stream
pub const AUDIO_OUTPUT_LABEL: &str = "outa";

/// Builds explicit stream maps for joins and stacks
pub struct StreamMapper;

impl StreamMapper {
    /// Map for a sequential join: one video and one audio source per input,
    /// one video and one audio output.
    ///
    /// Inputs missing a stream get a generated stand-in of their own duration
    /// so every segment contributes to both outputs. No video output is
    /// produced when no input has video.
    pub fn for_concat(inputs: &[MediaMetadata]) -> Result<StreamMap, DomainError> {
        if inputs.is_empty() {
            return Err(DomainError::BadArgs("Nothing to join".to_string()));
        }

        let any_video = inputs.iter().any(MediaMetadata::has_video);
        let mut map = StreamMap::default();

        for (i, media) in inputs.iter().enumerate() {
            if any_video {
                map.sources
                    .push(Self::source(StreamKind::Video, i, media.has_video(), media));
            }
            map.sources
                .push(Self::source(StreamKind::Audio, i, media.has_audio(), media));
        }

        if any_video {
            map.outputs.push(OutputStream {
                kind: StreamKind::Video,
                label: VIDEO_OUTPUT_LABEL.to_string(),
            });
        }
        map.outputs.push(OutputStream {
            kind: StreamKind::Audio,
            label: AUDIO_OUTPUT_LABEL.to_string(),
        });

        Self::validate_mapping(&map, inputs.len())?;
        Ok(map)
    }

    /// Map for a side-by-side or top-bottom stack.
    ///
    /// Both inputs contribute video. Audio comes from the primary input only;
    /// a silent primary gets generated silence, never the secondary's track.
    pub fn for_stack(
        primary: &MediaMetadata,
        secondary: &MediaMetadata,
    ) -> Result<StreamMap, DomainError> {
        for (name, media) in [("primary", primary), ("secondary", secondary)] {
            if !media.has_video() {
                return Err(DomainError::BadArgs(format!(
                    "Stack {} input has no video stream: {}",
                    name,
                    media.path.display()
                )));
            }
        }

        let mut map = StreamMap::default();
        map.sources.push(Self::source(StreamKind::Video, 0, true, primary));
        map.sources.push(Self::source(StreamKind::Video, 1, true, secondary));

        let audio = if primary.has_audio() {
            Self::source(StreamKind::Audio, 0, true, primary)
        } else {
            // Silence spans the longer input since the stack runs that long
            SourceStream {
                kind: StreamKind::Audio,
                source: StreamSource::Generated {
                    input: 0,
                    duration_seconds: primary.duration_seconds.max(secondary.duration_seconds),
                },
                label: format!("{}0", StreamKind::Audio.specifier()),
            }
        };
        map.sources.push(audio);

        map.outputs.push(OutputStream {
            kind: StreamKind::Video,
            label: VIDEO_OUTPUT_LABEL.to_string(),
        });
        map.outputs.push(OutputStream {
            kind: StreamKind::Audio,
            label: AUDIO_OUTPUT_LABEL.to_string(),
        });

        Self::validate_mapping(&map, 2)?;
        Ok(map)
    }

    /// Validate a stream map against the number of inputs it references
    pub fn validate_mapping(map: &StreamMap, input_count: usize) -> Result<(), DomainError> {
        if map.output_count(StreamKind::Audio) != 1 {
            return Err(DomainError::BadArgs(format!(
                "Stream map must produce exactly one audio stream, found {}",
                map.output_count(StreamKind::Audio)
            )));
        }
        if map.output_count(StreamKind::Video) > 1 {
            return Err(DomainError::BadArgs(
                "Stream map produces more than one video stream".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        let all_labels = map
            .sources
            .iter()
            .map(|s| s.label.as_str())
            .chain(map.outputs.iter().map(|o| o.label.as_str()));
        for label in all_labels {
            if !labels.insert(label) {
                return Err(DomainError::BadArgs(format!(
                    "Duplicate stream label: {}",
                    label
                )));
            }
        }

        if let Some(stray) = map.sources.iter().find(|s| s.input() >= input_count) {
            return Err(DomainError::BadArgs(format!(
                "Stream {} references missing input {}",
                stray.label,
                stray.input()
            )));
        }

        Ok(())
    }

    fn source(kind: StreamKind, input: usize, present: bool, media: &MediaMetadata) -> SourceStream {
        let source = if present {
            StreamSource::Input { input, index: 0 }
        } else {
            StreamSource::Generated {
                input,
                duration_seconds: media.duration_seconds,
            }
        };
        SourceStream {
            kind,
            source,
            label: format!("{}{}", kind.specifier(), input),
        }
    }
}
