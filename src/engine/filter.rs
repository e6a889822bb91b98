//! Filter-mode joins: normalize every segment, then concatenate in a filter graph

use std::path::Path;

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeArgs, FrameRate, InputSpec, MediaMetadata, ToolInvocation};
use crate::domain::rules::{EncodeArgPlanner, NORMALIZED_AUDIO_SAMPLE_RATE};
use crate::planner::CompositionPlan;
use crate::streams::{SourceStream, StreamKind, StreamMap, StreamSource};

const FALLBACK_FRAME_SIZE: (u32, u32) = (1280, 720);

/// Builds re-encoding joins over an explicit stream map
pub struct FilterJoiner;

impl FilterJoiner {
    /// Invocation for a filter plan; copy plans are rejected
    pub fn invocation(plan: &CompositionPlan, output: &Path) -> Result<ToolInvocation, DomainError> {
        let CompositionPlan::Filter {
            inputs,
            frame_rate_target,
            stream_map,
            ..
        } = plan
        else {
            return Err(DomainError::BadArgs(
                "Filter join requires a filter plan".to_string(),
            ));
        };

        let frame_size = Self::frame_size(inputs);
        let graph = Self::filter_graph(stream_map, *frame_rate_target, frame_size);
        let first_video = inputs.iter().find_map(|m| m.video.as_ref());

        let mut args = EncodeArgs::new()
            .opt("-filter_complex", graph)
            .extend(stream_map.map_args());
        if stream_map.output_count(StreamKind::Video) > 0 {
            args = args
                .extend(EncodeArgPlanner::video_encode_args(first_video, true))
                .opt("-r", frame_rate_target.to_string());
        }
        args = args.extend(EncodeArgPlanner::audio_args(true));

        let specs = inputs.iter().map(|m| InputSpec::file(&m.path)).collect();
        Ok(ToolInvocation::new(specs, args, output))
    }

    /// Complete `-filter_complex` graph: per-segment normalization then `concat`
    pub fn filter_graph(map: &StreamMap, rate: FrameRate, frame_size: (u32, u32)) -> String {
        let mut chains: Vec<String> = map
            .sources
            .iter()
            .map(|source| match source.kind {
                StreamKind::Video => Self::video_chain(source, rate, frame_size),
                StreamKind::Audio => Self::audio_chain(source),
            })
            .collect();

        let segments = map.source_count(StreamKind::Audio);
        let with_video = map.output_count(StreamKind::Video) > 0;

        let mut pads = String::new();
        for input in 0..segments {
            for source in map.sources.iter().filter(|s| s.input() == input) {
                if with_video || source.kind == StreamKind::Audio {
                    pads.push_str(&format!("[{}]", source.label));
                }
            }
        }

        let outputs: String = [StreamKind::Video, StreamKind::Audio]
            .into_iter()
            .filter_map(|kind| map.output_label(kind))
            .map(|label| format!("[{}]", label))
            .collect();

        chains.push(format!(
            "{}concat=n={}:v={}:a=1{}",
            pads,
            segments,
            u8::from(with_video),
            outputs
        ));
        chains.join(";")
    }

    /// Target frame size: the first video input's, rounded down to even dimensions
    pub fn frame_size(inputs: &[MediaMetadata]) -> (u32, u32) {
        inputs
            .iter()
            .find_map(|m| m.video.as_ref())
            .filter(|v| v.width >= 2 && v.height >= 2)
            .map(|v| (v.width & !1, v.height & !1))
            .unwrap_or(FALLBACK_FRAME_SIZE)
    }

    fn video_chain(source: &SourceStream, rate: FrameRate, (w, h): (u32, u32)) -> String {
        match &source.source {
            StreamSource::Input { .. } => format!(
                "[{spec}]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={rate},format=yuv420p,\
                 setpts=PTS-STARTPTS[{label}]",
                spec = source.specifier().unwrap_or_default(),
                label = source.label,
            ),
            StreamSource::Generated {
                duration_seconds, ..
            } => format!(
                "color=c=black:s={w}x{h}:r={rate}:d={duration_seconds:.3},format=yuv420p,\
                 setsar=1[{label}]",
                label = source.label,
            ),
        }
    }

    fn audio_chain(source: &SourceStream) -> String {
        match &source.source {
            StreamSource::Input { .. } => format!(
                "[{}]aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo,\
                 asetpts=PTS-STARTPTS[{}]",
                source.specifier().unwrap_or_default(),
                NORMALIZED_AUDIO_SAMPLE_RATE,
                source.label
            ),
            StreamSource::Generated {
                duration_seconds, ..
            } => silence_chain(*duration_seconds, &source.label),
        }
    }
}

/// Stereo/48 kHz silence of a fixed length, labelled `label`
pub fn silence_chain(duration_seconds: f64, label: &str) -> String {
    format!(
        "anullsrc=r={}:cl=stereo,atrim=duration={:.3},asetpts=PTS-STARTPTS[{}]",
        NORMALIZED_AUDIO_SAMPLE_RATE, duration_seconds, label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::*;
    use crate::planner::CompositionPlanner;
    use std::path::PathBuf;

    fn clip(path: &str, width: u32, height: u32, audio: bool) -> MediaMetadata {
        MediaMetadata {
            path: PathBuf::from(path),
            container: "mp4".to_string(),
            duration_seconds: 2.5,
            file_size: 1,
            video: Some(VideoParams {
                codec: "h264".to_string(),
                width,
                height,
                pixel_format: "yuv420p".to_string(),
                frame_rate: FrameRate::from_integer(30).unwrap(),
            }),
            audio: audio.then(|| AudioParams {
                codec: "aac".to_string(),
                channels: 2,
                sample_rate_hz: 44_100,
            }),
            video_stream_count: 1,
            audio_stream_count: usize::from(audio),
        }
    }

    fn filter_plan(inputs: &[MediaMetadata]) -> CompositionPlan {
        CompositionPlanner::new(FrameRate::from_integer(25).unwrap())
            .filter_plan(inputs, "test".to_string())
            .unwrap()
    }

    #[test]
    fn test_graph_normalizes_and_concatenates() {
        let plan = filter_plan(&[clip("a.mp4", 1281, 721, true), clip("b.mp4", 1920, 1080, true)]);
        let invocation = FilterJoiner::invocation(&plan, Path::new("out.mp4")).unwrap();
        let graph = invocation.args.value_of("-filter_complex").unwrap();

        assert!(graph.contains("[0:v:0]scale=1280:720"));
        assert!(graph.contains("fps=25/1"));
        assert!(graph.contains("setpts=PTS-STARTPTS[v1]"));
        assert!(graph.contains("[1:a:0]aresample=48000"));
        assert!(graph.ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[outv][outa]"));

        assert_eq!(invocation.args.values_of("-map"), vec!["[outv]", "[outa]"]);
        assert_eq!(invocation.args.value_of("-r"), Some("25/1"));
        assert_eq!(invocation.args.value_of("-c:a"), Some("aac"));
        assert!(!invocation.args.is_stream_copy());
        assert_eq!(invocation.inputs.len(), 2);
    }

    #[test]
    fn test_graph_synthesizes_silence() {
        let plan = filter_plan(&[clip("a.mp4", 640, 360, true), clip("b.mp4", 640, 360, false)]);
        let invocation = FilterJoiner::invocation(&plan, Path::new("out.mp4")).unwrap();
        let graph = invocation.args.value_of("-filter_complex").unwrap();
        assert!(graph.contains("anullsrc=r=48000:cl=stereo,atrim=duration=2.500"));
        assert!(!graph.contains("[1:a:0]"));
    }

    #[test]
    fn test_copy_plan_is_rejected() {
        let plan = CompositionPlanner::new(FrameRate::from_integer(25).unwrap())
            .copy_plan(&[clip("a.mp4", 640, 360, true)], "uniform".to_string());
        assert!(FilterJoiner::invocation(&plan, Path::new("out.mp4")).is_err());
    }
}
