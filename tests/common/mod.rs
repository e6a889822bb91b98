//! Scriptable stand-in for the ffprobe/ffmpeg toolchain

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use phrasecut::domain::config::CoreConfig;
use phrasecut::domain::errors::DomainError;
use phrasecut::domain::model::{MediaMetadata, TimeSpec, ToolInvocation, ToolOutcome};
use phrasecut::ports::{MediaToolPort, NoTranscript, StoragePort, TranscriptPort};
use phrasecut::adapters::FsStorage;
use phrasecut::probe::parse_report;
use phrasecut::DefaultAppContainer;

/// Stream layout of a fake media file
#[derive(Debug, Clone)]
pub struct MediaSpec {
    pub format_name: String,
    pub duration: f64,
    pub video: Option<(String, u32, u32, String)>,
    pub audio: Option<(String, u32, u32)>,
    pub audio_streams: usize,
}

impl MediaSpec {
    /// h264 video at 25 fps plus one stereo 48 kHz aac track
    pub fn h264(duration: f64, width: u32, height: u32) -> Self {
        Self {
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            duration,
            video: Some(("h264".to_string(), width, height, "25/1".to_string())),
            audio: Some(("aac".to_string(), 48_000, 2)),
            audio_streams: 1,
        }
    }

    pub fn audio_only(duration: f64) -> Self {
        Self {
            video: None,
            ..Self::h264(duration, 0, 0)
        }
    }

    pub fn with_codec(mut self, codec: &str) -> Self {
        if let Some(video) = self.video.as_mut() {
            video.0 = codec.to_string();
        }
        self
    }

    pub fn with_frame_rate(mut self, rate: &str) -> Self {
        if let Some(video) = self.video.as_mut() {
            video.3 = rate.to_string();
        }
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        if let Some(audio) = self.audio.as_mut() {
            audio.1 = sample_rate;
        }
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.audio = None;
        self.audio_streams = 0;
        self
    }

    pub fn with_audio_streams(mut self, count: usize) -> Self {
        self.audio_streams = count;
        if count == 0 {
            self.audio = None;
        }
        self
    }

    /// Inspector report in ffprobe's JSON shape
    pub fn to_json(&self) -> String {
        let mut streams = Vec::new();
        if let Some((codec, width, height, rate)) = &self.video {
            streams.push(json!({
                "index": 0,
                "codec_type": "video",
                "codec_name": codec,
                "width": width,
                "height": height,
                "pix_fmt": "yuv420p",
                "r_frame_rate": rate,
                "avg_frame_rate": rate,
                "duration": format!("{:.6}", self.duration),
            }));
        }
        if let Some((codec, sample_rate, channels)) = &self.audio {
            for _ in 0..self.audio_streams {
                let index = streams.len();
                streams.push(json!({
                    "index": index,
                    "codec_type": "audio",
                    "codec_name": codec,
                    "sample_rate": sample_rate.to_string(),
                    "channels": channels,
                    "duration": format!("{:.6}", self.duration),
                }));
            }
        }
        json!({
            "streams": streams,
            "format": {
                "format_name": self.format_name,
                "duration": format!("{:.6}", self.duration),
                "size": "4096",
            }
        })
        .to_string()
    }

    fn from_metadata(metadata: &MediaMetadata, duration: f64, audio_streams: usize) -> Self {
        Self {
            format_name: metadata.container.clone(),
            duration,
            video: metadata.video.as_ref().map(|v| {
                (
                    v.codec.clone(),
                    v.width,
                    v.height,
                    v.frame_rate.to_string(),
                )
            }),
            audio: Some(("aac".to_string(), 48_000, 2)),
            audio_streams,
        }
    }
}

type OutputFn = dyn Fn(&ToolInvocation) -> Option<MediaSpec> + Send + Sync;
type FailFn = dyn Fn(&ToolInvocation) -> bool + Send + Sync;

/// Fake `MediaToolPort`: canned reports, recorded invocations, instrumented runs
pub struct FakeMediaTool {
    media: Mutex<HashMap<String, String>>,
    outputs: Mutex<HashMap<String, String>>,
    output_override: Option<Box<OutputFn>>,
    fail_when: Option<Box<FailFn>>,
    invocations: Mutex<Vec<ToolInvocation>>,
    inspect_counts: Mutex<HashMap<String, usize>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    run_delay: Duration,
    inspect_delay: Duration,
    writes_nothing: bool,
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for FakeMediaTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMediaTool {
    pub fn new() -> Self {
        Self {
            media: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
            output_override: None,
            fail_when: None,
            invocations: Mutex::new(Vec::new()),
            inspect_counts: Mutex::new(HashMap::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            run_delay: Duration::ZERO,
            inspect_delay: Duration::ZERO,
            writes_nothing: false,
        }
    }

    /// Serve `spec` whenever a file named `file_name` is inspected
    pub fn with_media(self, file_name: &str, spec: MediaSpec) -> Self {
        self.set_media(file_name, spec);
        self
    }

    /// Replace what a run produces; `None` falls back to the synthesized report
    pub fn with_output(
        mut self,
        output: impl Fn(&ToolInvocation) -> Option<MediaSpec> + Send + Sync + 'static,
    ) -> Self {
        self.output_override = Some(Box::new(output));
        self
    }

    /// Runs matching `predicate` write partial output and exit non-zero
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&ToolInvocation) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Runs exit 0 without creating any output
    pub fn writing_nothing(mut self) -> Self {
        self.writes_nothing = true;
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    pub fn with_inspect_delay(mut self, delay: Duration) -> Self {
        self.inspect_delay = delay;
        self
    }

    pub fn set_media(&self, file_name: &str, spec: MediaSpec) {
        self.media
            .lock()
            .unwrap()
            .insert(file_name.to_string(), spec.to_json());
    }

    pub fn inspect_count(&self, file_name: &str) -> usize {
        self.inspect_counts
            .lock()
            .unwrap()
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_inspections(&self) -> usize {
        self.inspect_counts.lock().unwrap().values().sum()
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn max_concurrent_runs(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn metadata_for(&self, path: &Path) -> Option<MediaMetadata> {
        let name = file_name(path);
        let raw = self.media.lock().unwrap().get(&name).cloned()?;
        parse_report(path, &raw).ok()
    }

    fn sources(&self, invocation: &ToolInvocation) -> Vec<MediaMetadata> {
        let mut sources = Vec::new();
        for input in &invocation.inputs {
            let paths = if input.options.iter().any(|o| o == "concat") {
                read_concat_list(&input.path)
            } else {
                vec![input.path.clone()]
            };
            sources.extend(paths.iter().filter_map(|p| self.metadata_for(p)));
        }
        sources
    }

    /// What a well-behaved encoder would have produced
    fn synthesize(&self, invocation: &ToolInvocation) -> Option<MediaSpec> {
        let sources = self.sources(invocation);
        let first = sources.first()?;
        let graph = invocation.args.value_of("-filter_complex").unwrap_or("");

        let duration = match invocation.args.value_of("-t") {
            Some(t) => TimeSpec::parse(t).map(|t| t.seconds).unwrap_or(0.0),
            None if graph.contains("stack") => sources
                .iter()
                .map(|m| m.duration_seconds)
                .fold(0.0, f64::max),
            None => sources.iter().map(|m| m.duration_seconds).sum(),
        };
        let audio_streams = if invocation.args.is_stream_copy() {
            usize::from(first.has_audio())
        } else {
            1
        };
        Some(MediaSpec::from_metadata(first, duration, audio_streams))
    }
}

#[async_trait]
impl MediaToolPort for FakeMediaTool {
    async fn inspect(&self, path: &Path, _timeout: Duration) -> Result<String, DomainError> {
        let name = file_name(path);
        *self
            .inspect_counts
            .lock()
            .unwrap()
            .entry(name.clone())
            .or_insert(0) += 1;

        if !self.inspect_delay.is_zero() {
            tokio::time::sleep(self.inspect_delay).await;
        }

        if let Some(raw) = self.outputs.lock().unwrap().get(&name) {
            return Ok(raw.clone());
        }
        self.media
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or_else(|| DomainError::ProbeMalformed {
                path: path.display().to_string(),
                reason: "Invalid data found when processing input".to_string(),
            })
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome, DomainError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        if self.fail_when.as_ref().is_some_and(|f| f(invocation)) {
            let _ = std::fs::write(&invocation.output, b"partial");
            return Ok(ToolOutcome {
                exit_code: Some(1),
                stderr: "Error while decoding stream #0:0\nConversion failed!".to_string(),
            });
        }

        if self.writes_nothing {
            return Ok(ToolOutcome::success());
        }

        let _ = std::fs::write(&invocation.output, b"encoded media");
        let produced = self
            .output_override
            .as_ref()
            .and_then(|f| f(invocation))
            .or_else(|| self.synthesize(invocation));
        if let Some(spec) = produced {
            self.outputs
                .lock()
                .unwrap()
                .insert(file_name(&invocation.output), spec.to_json());
        }
        Ok(ToolOutcome::success())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_concat_list(path: &Path) -> Vec<PathBuf> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\''))
        .map(|quoted| PathBuf::from(quoted.replace("'\\''", "'")))
        .collect()
}

/// Create a placeholder media file
pub fn media_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("fake media {}", name)).unwrap();
    path
}

/// Default configuration rooted inside `dir`
pub fn config_in(dir: &Path) -> CoreConfig {
    let mut config = CoreConfig::default();
    config.slicer.work_dir = dir.join("work");
    config.storage.root = dir.join("store");
    config.slicer.max_concurrency = Some(2);
    config
}

/// Files left under `dir`, recursively
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

/// A container wired to a fake toolchain inside a temporary directory
pub struct Harness {
    pub dir: TempDir,
    pub tool: Arc<FakeMediaTool>,
    pub container: DefaultAppContainer,
}

impl Harness {
    pub fn new(tool: FakeMediaTool) -> Self {
        Self::with(tool, |_| {}, Arc::new(NoTranscript))
    }

    pub fn with(
        tool: FakeMediaTool,
        configure: impl FnOnce(&mut CoreConfig),
        transcripts: Arc<dyn TranscriptPort>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        configure(&mut config);
        let tool = Arc::new(tool);
        let storage: Arc<dyn StoragePort> = Arc::new(FsStorage::new(&config.storage.root));
        let container = DefaultAppContainer::with_ports(
            config,
            Arc::clone(&tool) as Arc<dyn MediaToolPort>,
            storage,
            transcripts,
        )
        .unwrap();
        Self {
            dir,
            tool,
            container,
        }
    }

    pub fn media(&self, name: &str) -> PathBuf {
        media_file(self.dir.path(), name)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
