//! Media inspection: runs the external inspector and parses its report

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::ports::MediaToolPort;

/// Raw inspector report (`-print_format json -show_format -show_streams`)
#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeDisposition {
    #[serde(default)]
    attached_pic: i32,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    disposition: ProbeDisposition,
}

impl ProbeStream {
    fn is_video(&self) -> bool {
        // Cover art is reported as a video stream but is not one
        self.codec_type.as_deref() == Some("video") && self.disposition.attached_pic == 0
    }

    fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }
}

/// Invokes the external inspector and converts its output into `MediaMetadata`
pub struct MediaProbe {
    tool: Arc<dyn MediaToolPort>,
    timeout: Duration,
}

impl MediaProbe {
    /// Create a probe; the timeout is clamped to at least one second
    pub fn new(tool: Arc<dyn MediaToolPort>, timeout: Duration) -> Self {
        Self {
            tool,
            timeout: timeout.max(Duration::from_secs(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Inspect a file without any caching
    pub async fn inspect(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
        let started = Instant::now();
        let raw = self.tool.inspect(path, self.timeout).await?;
        let mut metadata = parse_report(path, &raw)?;

        if metadata.file_size == 0 {
            if let Ok(stat) = tokio::fs::metadata(path).await {
                metadata.file_size = stat.len();
            }
        }

        debug!(
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            duration = metadata.duration_seconds,
            video_streams = metadata.video_stream_count,
            audio_streams = metadata.audio_stream_count,
            "Probed media file"
        );
        Ok(metadata)
    }
}

/// Parse an inspector JSON report into `MediaMetadata`
pub fn parse_report(path: &Path, raw: &str) -> Result<MediaMetadata, DomainError> {
    let malformed = |reason: String| DomainError::ProbeMalformed {
        path: path.display().to_string(),
        reason,
    };

    let report: ProbeReport =
        serde_json::from_str(raw).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let video_streams: Vec<&ProbeStream> = report.streams.iter().filter(|s| s.is_video()).collect();
    let audio_streams: Vec<&ProbeStream> = report.streams.iter().filter(|s| s.is_audio()).collect();

    let video = match video_streams.first() {
        Some(stream) => Some(parse_video(stream).map_err(malformed)?),
        None => None,
    };
    let audio = match audio_streams.first() {
        Some(stream) => Some(parse_audio(stream).map_err(malformed)?),
        None => None,
    };

    let format_duration = report
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);
    let stream_duration = report
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
        .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));
    let duration_seconds = format_duration
        .or(stream_duration)
        .ok_or_else(|| malformed("no duration reported".to_string()))?;

    let container = report
        .format
        .as_ref()
        .and_then(|f| f.format_name.clone())
        .unwrap_or_default();
    let file_size = report
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(MediaMetadata {
        path: path.to_path_buf(),
        container,
        duration_seconds,
        file_size,
        video,
        audio,
        video_stream_count: video_streams.len(),
        audio_stream_count: audio_streams.len(),
    })
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

fn parse_video(stream: &ProbeStream) -> Result<VideoParams, String> {
    let frame_rate = [stream.r_frame_rate.as_deref(), stream.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|rate| FrameRate::parse(rate).ok())
        .ok_or_else(|| "video stream has no usable frame rate".to_string())?;

    Ok(VideoParams {
        codec: stream.codec_name.clone().unwrap_or_default(),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        pixel_format: stream.pix_fmt.clone().unwrap_or_default(),
        frame_rate,
    })
}

fn parse_audio(stream: &ProbeStream) -> Result<AudioParams, String> {
    let sample_rate_hz = match stream.sample_rate.as_deref() {
        Some(rate) => rate
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid audio sample rate: {}", rate))?,
        None => 0,
    };

    Ok(AudioParams {
        codec: stream.codec_name.clone().unwrap_or_default(),
        channels: stream.channels.unwrap_or(0),
        sample_rate_hz,
    })
}
