// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string: seconds (`12.5`), `MM:SS.ms` or `HH:MM:SS.ms`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    time_str
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0u32, *m, *s),
            [h, m, s] => {
                let hours = h
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs(format!("Invalid hours in {}", time_str)))?;
                (hours, *m, *s)
            }
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time format: {}. Supported formats: seconds, MM:SS.ms, HH:MM:SS.ms",
                    time_str
                )))
            }
        };

        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid minutes in {}", time_str)))?;
        let seconds = seconds_part
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid seconds in {}", time_str)))?;

        if parts.len() == 3 && minutes >= 60 {
            return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
        }
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Format as `HH:MM:SS.mmm`, the form ffmpeg accepts for `-ss`/`-t`
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let millis = total_millis % 1000;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Rational frame rate, e.g. `25/1` or `30000/1001`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Create a new frame rate; both terms must be positive
    pub fn new(num: u32, den: u32) -> Result<Self, DomainError> {
        if num == 0 || den == 0 {
            return Err(DomainError::BadArgs(format!(
                "Invalid frame rate {}/{}",
                num, den
            )));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate
    pub fn from_integer(fps: u32) -> Result<Self, DomainError> {
        Self::new(fps, 1)
    }

    /// Parse `num/den` or a plain number as reported by inspection tools
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        if let Some((num, den)) = value.split_once('/') {
            let num = num
                .trim()
                .parse::<u32>()
                .map_err(|_| DomainError::BadArgs(format!("Invalid frame rate: {}", value)))?;
            let den = den
                .trim()
                .parse::<u32>()
                .map_err(|_| DomainError::BadArgs(format!("Invalid frame rate: {}", value)))?;
            return Self::new(num, den);
        }

        let fps = value
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid frame rate: {}", value)))?;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(DomainError::BadArgs(format!("Invalid frame rate: {}", value)));
        }
        // Three decimal places are enough to express the NTSC family exactly
        Self::new((fps * 1000.0).round() as u32, 1000).map(|r| r.reduced())
    }

    /// Frames per second as a float
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Lowest-terms form
    pub fn reduced(&self) -> Self {
        let divisor = gcd(self.num, self.den).max(1);
        Self {
            num: self.num / divisor,
            den: self.den / divisor,
        }
    }
}

impl PartialEq for FrameRate {
    fn eq(&self, other: &Self) -> bool {
        self.num as u64 * other.den as u64 == other.num as u64 * self.den as u64
    }
}

impl Eq for FrameRate {}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reduced = self.reduced();
        write!(f, "{}/{}", reduced.num, reduced.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Snapshot of one video stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoParams {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub pixel_format: String,
    pub frame_rate: FrameRate,
}

impl VideoParams {
    /// Get aspect ratio
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// Snapshot of one audio stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    pub codec: String,
    pub channels: u32,
    pub sample_rate_hz: u32,
}

/// Probed description of a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub path: PathBuf,
    /// Container format name reported by the inspector (e.g. `mov,mp4,m4a,3gp,3g2,mj2`)
    pub container: String,
    pub duration_seconds: f64,
    pub file_size: u64,
    /// First video stream, absent if the file has none
    pub video: Option<VideoParams>,
    /// First audio stream, absent if the file has none
    pub audio: Option<AudioParams>,
    pub video_stream_count: usize,
    pub audio_stream_count: usize,
}

impl MediaMetadata {
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Lowercased file extension, used as the container-compatibility key
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Content identity of a probed file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub absolute_path: PathBuf,
    pub mod_time_unix_nanos: i128,
    pub size_bytes: u64,
}

impl CacheKey {
    /// Build a key from an absolute path and its filesystem metadata
    pub fn from_metadata(absolute_path: PathBuf, metadata: &std::fs::Metadata) -> Self {
        let mod_time_unix_nanos = metadata
            .modified()
            .map(|modified| match modified.duration_since(std::time::UNIX_EPOCH) {
                Ok(after) => after.as_nanos() as i128,
                Err(before) => -(before.duration().as_nanos() as i128),
            })
            .unwrap_or(0);

        Self {
            absolute_path,
            mod_time_unix_nanos,
            size_bytes: metadata.len(),
        }
    }
}

/// One recognised word with its timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    #[serde(alias = "word")]
    pub text: String,
    #[serde(alias = "start")]
    pub start_seconds: f64,
    #[serde(alias = "end")]
    pub end_seconds: f64,
    #[serde(default = "default_word_confidence")]
    pub confidence: f64,
}

fn default_word_confidence() -> f64 {
    1.0
}

impl WordTimestamp {
    pub fn new(text: &str, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            text: text.to_string(),
            start_seconds,
            end_seconds,
            confidence: 1.0,
        }
    }
}

/// Where an expression window came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentSource {
    /// Matched against a word-level transcript
    Transcript,
    /// Approximate subtitle window, unverified
    SubtitleFallback,
}

/// A scored contiguous span of transcript words
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentCandidate {
    pub words: Vec<WordTimestamp>,
    pub score: f64,
    pub source: AlignmentSource,
}

impl AlignmentCandidate {
    pub fn start_seconds(&self) -> Option<f64> {
        self.words.first().map(|w| w.start_seconds)
    }

    pub fn end_seconds(&self) -> Option<f64> {
        self.words.last().map(|w| w.end_seconds)
    }
}

/// Resolved time window for one expression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpressionWindow {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub buffer_start: f64,
    pub buffer_end: f64,
    pub confidence: f64,
    pub source: AlignmentSource,
}

impl ExpressionWindow {
    /// Start including the leading buffer, never negative
    pub fn padded_start(&self) -> f64 {
        (self.start_seconds - self.buffer_start).max(0.0)
    }

    /// End including the trailing buffer
    pub fn padded_end(&self) -> f64 {
        self.end_seconds + self.buffer_end
    }

    /// Length of the padded window
    pub fn duration(&self) -> f64 {
        (self.padded_end() - self.padded_start()).max(0.0)
    }
}

/// A request to cut one expression out of a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub media_path: PathBuf,
    pub expression_text: String,
    pub approximate_start: f64,
    pub approximate_end: f64,
    pub media_id: String,
}

impl SliceRequest {
    pub fn new(
        media_path: impl Into<PathBuf>,
        expression_text: &str,
        approximate_start: f64,
        approximate_end: f64,
        media_id: &str,
    ) -> Self {
        Self {
            media_path: media_path.into(),
            expression_text: expression_text.to_string(),
            approximate_start,
            approximate_end,
            media_id: media_id.to_string(),
        }
    }

    /// Reject requests that can never produce an artifact
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.media_path.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("Media path cannot be empty".to_string()));
        }
        if self.expression_text.trim().is_empty() {
            return Err(DomainError::BadArgs("Expression text cannot be empty".to_string()));
        }
        if !self.approximate_start.is_finite() || !self.approximate_end.is_finite() {
            return Err(DomainError::BadArgs("Approximate window must be finite".to_string()));
        }
        if self.approximate_start < 0.0 {
            return Err(DomainError::BadArgs("Approximate start cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// Stage of the slicing pipeline that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStage {
    Validate,
    Probe,
    Trim,
    Storage,
    Cancelled,
}

impl fmt::Display for SliceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SliceStage::Validate => "validate",
            SliceStage::Probe => "probe",
            SliceStage::Trim => "trim",
            SliceStage::Storage => "storage",
            SliceStage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Outcome of one slice request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResult {
    pub expression_text: String,
    /// Storage reference of the published artifact
    pub output: Option<String>,
    pub window: ExpressionWindow,
    pub succeeded: bool,
    pub failed_stage: Option<SliceStage>,
    pub error: Option<String>,
}

impl SliceResult {
    pub fn success(expression_text: &str, output: String, window: ExpressionWindow) -> Self {
        Self {
            expression_text: expression_text.to_string(),
            output: Some(output),
            window,
            succeeded: true,
            failed_stage: None,
            error: None,
        }
    }

    pub fn failure(
        expression_text: &str,
        window: ExpressionWindow,
        stage: SliceStage,
        error: &DomainError,
    ) -> Self {
        Self {
            expression_text: expression_text.to_string(),
            output: None,
            window,
            succeeded: false,
            failed_stage: Some(stage),
            error: Some(format!("{} stage: {}", stage, error)),
        }
    }
}

/// Ordered argument list handed to the external encode tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeArgs(Vec<String>);

impl EncodeArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a flag with its value
    pub fn opt(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.0.push(flag.to_string());
        self.0.push(value.into());
        self
    }

    /// Append a bare flag
    pub fn flag(mut self, flag: &str) -> Self {
        self.0.push(flag.to_string());
        self
    }

    pub fn extend(mut self, other: EncodeArgs) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value following the first occurrence of `flag`
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.0
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.0.get(i + 1))
            .map(String::as_str)
    }

    /// All values following occurrences of `flag`
    pub fn values_of(&self, flag: &str) -> Vec<&str> {
        self.0
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }

    /// True when no stream is re-encoded and no filter graph is applied
    pub fn is_stream_copy(&self) -> bool {
        let codec_flags = ["-c", "-c:v", "-c:a", "-codec"];
        let mut saw_codec = false;
        for pair in self.0.windows(2) {
            if codec_flags.contains(&pair[0].as_str()) {
                saw_codec = true;
                if pair[1] != "copy" {
                    return false;
                }
            }
        }
        let filtered = self
            .0
            .iter()
            .any(|a| matches!(a.as_str(), "-filter_complex" | "-vf" | "-af" | "-filter:a"));
        saw_codec && !filtered
    }
}

/// One input of an external tool run, with its input-side options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub options: Vec<String>,
    pub path: PathBuf,
}

impl InputSpec {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            options: Vec::new(),
            path: path.into(),
        }
    }

    pub fn with_options(path: impl Into<PathBuf>, options: &[&str]) -> Self {
        Self {
            options: options.iter().map(|o| o.to_string()).collect(),
            path: path.into(),
        }
    }
}

/// A fully planned external encode/trim invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub inputs: Vec<InputSpec>,
    pub args: EncodeArgs,
    pub output: PathBuf,
}

impl ToolInvocation {
    pub fn new(inputs: Vec<InputSpec>, args: EncodeArgs, output: &Path) -> Self {
        Self {
            inputs,
            args,
            output: output.to_path_buf(),
        }
    }

    /// Render as an argument vector: inputs, then output options, then output path
    pub fn to_command_args(&self) -> Vec<String> {
        let mut rendered = Vec::new();
        for input in &self.inputs {
            rendered.extend(input.options.iter().cloned());
            rendered.push("-i".to_string());
            rendered.push(input.path.to_string_lossy().to_string());
        }
        rendered.extend(self.args.as_slice().iter().cloned());
        rendered.push(self.output.to_string_lossy().to_string());
        rendered
    }
}

/// Exit status and diagnostics of an external tool run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ToolOutcome {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a non-zero exit into a `ToolFailure`, keeping the stderr tail
    pub fn into_result(self, tool: &str) -> Result<(), DomainError> {
        if self.is_success() {
            return Ok(());
        }
        Err(DomainError::ToolFailure {
            tool: tool.to_string(),
            exit_code: self.exit_code,
            stderr: stderr_tail(&self.stderr, 20),
        })
    }
}

/// Last `lines` lines of a stderr capture
pub fn stderr_tail(stderr: &str, lines: usize) -> String {
    let collected: Vec<&str> = stderr.lines().rev().take(lines).collect();
    collected.into_iter().rev().collect::<Vec<_>>().join("\n")
}
