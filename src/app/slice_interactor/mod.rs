// Slice interactor - Aligns expressions and cuts them out under a concurrency ceiling

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::align::{text, TimestampAligner};
use crate::domain::config::{AlignmentSettings, SlicerSettings};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::EncodeArgPlanner;
use crate::output::StagedOutput;
use crate::ports::{MediaToolPort, StoragePort, TranscriptPort};
use crate::probe::ProbeCache;

/// Aggregate outcome of a batch, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    pub results: Vec<SliceResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchManifest {
    pub fn new(results: Vec<SliceResult>, cancelled: bool) -> Self {
        let succeeded = results.iter().filter(|r| r.succeeded).count();
        Self {
            failed: results.len() - succeeded,
            succeeded,
            results,
            cancelled,
        }
    }
}

/// Per-expression extraction with a hard limit on concurrent trim processes
pub struct BoundedSlicer {
    tool: Arc<dyn MediaToolPort>,
    cache: Arc<ProbeCache>,
    storage: Arc<dyn StoragePort>,
    transcripts: Arc<dyn TranscriptPort>,
    aligner: TimestampAligner,
    semaphore: Arc<Semaphore>,
    limit: usize,
    work_dir: PathBuf,
}

impl BoundedSlicer {
    pub fn new(
        tool: Arc<dyn MediaToolPort>,
        cache: Arc<ProbeCache>,
        storage: Arc<dyn StoragePort>,
        transcripts: Arc<dyn TranscriptPort>,
        alignment: AlignmentSettings,
        settings: &SlicerSettings,
    ) -> Self {
        let limit = settings.effective_concurrency();
        Self {
            tool,
            cache,
            storage,
            transcripts,
            aligner: TimestampAligner::new(alignment),
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            work_dir: settings.work_dir.clone(),
        }
    }

    /// Configured ceiling on concurrent trim processes
    pub fn concurrency_limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free; equals the limit whenever the slicer is idle
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Align, trim and publish one expression. Failures are reported in the result.
    pub async fn slice_one(&self, request: &SliceRequest) -> SliceResult {
        let started = Instant::now();
        let expression = request.expression_text.as_str();
        let approximate = self
            .aligner
            .fallback_window(request.approximate_start, request.approximate_end);

        if let Err(err) = request.validate() {
            return Self::failed(request, approximate, SliceStage::Validate, err);
        }

        let transcript = match self.transcripts.transcript_for(&request.media_path).await {
            Ok(words) => words,
            Err(err) => {
                warn!(expression, "Transcript unavailable, using subtitle window: {}", err);
                None
            }
        };
        let window = self.aligner.align(
            expression,
            request.approximate_start,
            request.approximate_end,
            transcript.as_deref(),
        );

        let metadata = match self.cache.get(&request.media_path).await {
            Ok(metadata) => metadata,
            Err(err) => return Self::failed(request, window, SliceStage::Probe, err),
        };
        if window.padded_start() >= metadata.duration_seconds {
            let err = DomainError::BadArgs(format!(
                "Window starts at {:.3}s, after the end of the media ({:.3}s)",
                window.padded_start(),
                metadata.duration_seconds
            ));
            return Self::failed(request, window, SliceStage::Validate, err);
        }

        let file_name = Self::artifact_name(request, &window, &metadata);
        let staged = match self.trim(request, &window, &metadata, &file_name).await {
            Ok(staged) => staged,
            Err(err) => return Self::failed(request, window, SliceStage::Trim, err),
        };

        let logical_key = format!("{}/{}", Self::media_key(request), file_name);
        let stored = self.storage.store(staged.path(), &logical_key).await;
        Self::cleanup(staged);

        match stored {
            Ok(reference) => {
                info!(
                    expression,
                    output = %reference,
                    source = ?window.source,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Slice stored"
                );
                SliceResult::success(expression, reference, window)
            }
            Err(err) => Self::failed(request, window, SliceStage::Storage, err),
        }
    }

    /// Slice every request; results come back in request order
    pub async fn slice_many(self: &Arc<Self>, requests: Vec<SliceRequest>) -> BatchManifest {
        self.slice_many_until(requests, std::future::pending::<()>())
            .await
    }

    /// Like `slice_many`, but aborts in-flight work once `cancel` resolves.
    ///
    /// Aborted slices report the `Cancelled` stage; their permits and staged
    /// files are released as the tasks are dropped.
    pub async fn slice_many_until<F>(
        self: &Arc<Self>,
        requests: Vec<SliceRequest>,
        cancel: F,
    ) -> BatchManifest
    where
        F: Future<Output = ()>,
    {
        info!(
            "Slicing {} expressions with at most {} concurrent trims",
            requests.len(),
            self.limit
        );

        let mut slots: Vec<Option<SliceResult>> = vec![None; requests.len()];
        let mut tasks = JoinSet::new();
        for (index, request) in requests.iter().cloned().enumerate() {
            let slicer = Arc::clone(self);
            tasks.spawn(async move { (index, slicer.slice_one(&request).await) });
        }

        tokio::pin!(cancel);
        let mut cancelled = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => slots[index] = Some(result),
                    Some(Err(join_error)) if join_error.is_panic() => {
                        error!("Slice task panicked: {}", join_error);
                    }
                    Some(Err(_)) => {}
                    None => break,
                },
                _ = &mut cancel, if !cancelled => {
                    warn!("Batch cancelled, aborting {} in-flight slices", tasks.len());
                    cancelled = true;
                    tasks.abort_all();
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(requests.iter())
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| {
                    let window = self
                        .aligner
                        .fallback_window(request.approximate_start, request.approximate_end);
                    if cancelled {
                        SliceResult::failure(
                            &request.expression_text,
                            window,
                            SliceStage::Cancelled,
                            &DomainError::Cancelled("batch cancelled".to_string()),
                        )
                    } else {
                        SliceResult::failure(
                            &request.expression_text,
                            window,
                            SliceStage::Trim,
                            &DomainError::SliceToolFailure {
                                expression: request.expression_text.clone(),
                                reason: "slice task terminated unexpectedly".to_string(),
                            },
                        )
                    }
                })
            })
            .collect();

        let manifest = BatchManifest::new(results, cancelled);
        info!(
            "Batch finished: {} succeeded, {} failed",
            manifest.succeeded, manifest.failed
        );
        manifest
    }

    /// Run the trim process into a staged file in the work directory.
    ///
    /// The concurrency slot is held only while the process runs. A failed
    /// run removes its partial output before returning.
    async fn trim(
        &self,
        request: &SliceRequest,
        window: &ExpressionWindow,
        metadata: &MediaMetadata,
        file_name: &str,
    ) -> Result<StagedOutput, DomainError> {
        let staged = StagedOutput::create(&self.work_dir.join(file_name))?;
        let invocation = Self::trim_invocation(&request.media_path, window, metadata, staged.path());

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DomainError::Cancelled("slicer is shut down".to_string()))?;
        debug!(
            expression = %request.expression_text,
            args = ?invocation.to_command_args(),
            "Running trim"
        );
        let outcome = self.tool.run(&invocation).await;
        drop(permit);

        let checked = match outcome.and_then(|o| o.into_result("ffmpeg")) {
            Ok(()) => self.check_trimmed(staged.path(), metadata).await,
            Err(err) => Err(err),
        };
        match checked {
            Ok(()) => Ok(staged),
            Err(err) => {
                Self::cleanup(staged);
                Err(DomainError::SliceToolFailure {
                    expression: request.expression_text.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// A zero exit is not enough: the staged file must be non-empty media
    /// carrying the streams the source had.
    async fn check_trimmed(&self, output: &Path, source: &MediaMetadata) -> Result<(), DomainError> {
        let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(DomainError::ToolFailure {
                tool: "ffmpeg".to_string(),
                exit_code: Some(0),
                stderr: "trim produced an empty file".to_string(),
            });
        }

        let produced = self.cache.probe().inspect(output).await?;
        let mut problems = Vec::new();
        if produced.duration_seconds <= 0.0 {
            problems.push("no duration".to_string());
        }
        if source.has_video() && produced.video_stream_count == 0 {
            problems.push("video stream missing".to_string());
        }
        if source.has_audio() && produced.audio_stream_count == 0 {
            problems.push("audio stream missing".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::ToolFailure {
                tool: "ffmpeg".to_string(),
                exit_code: Some(0),
                stderr: format!("truncated trim output: {}", problems.join(", ")),
            })
        }
    }

    /// Accurate trim: seek before the input, re-encode, explicit stream selection
    pub fn trim_invocation(
        media_path: &Path,
        window: &ExpressionWindow,
        metadata: &MediaMetadata,
        output: &Path,
    ) -> ToolInvocation {
        let start = TimeSpec::from_seconds(window.padded_start()).format_hms();
        let duration = TimeSpec::from_seconds(window.duration()).format_hms();

        let mut args = EncodeArgs::new().opt("-t", duration);
        if metadata.has_video() {
            args = args
                .opt("-map", "0:v:0")
                .extend(EncodeArgPlanner::video_encode_args(metadata.video.as_ref(), false));
        }
        if metadata.has_audio() {
            args = args
                .opt("-map", "0:a:0")
                .extend(EncodeArgPlanner::audio_args(true));
        }
        args = args.opt("-avoid_negative_ts", "make_zero");

        ToolInvocation::new(
            vec![InputSpec::with_options(media_path, &["-ss", start.as_str()])],
            args,
            output,
        )
    }

    fn artifact_name(request: &SliceRequest, window: &ExpressionWindow, metadata: &MediaMetadata) -> String {
        let mut slug = text::tokens(&request.expression_text).join("-");
        if slug.len() > 48 {
            let mut cut = 48;
            while !slug.is_char_boundary(cut) {
                cut -= 1;
            }
            slug.truncate(cut);
        }
        if slug.is_empty() {
            slug.push_str("expression");
        }
        let extension = match metadata.extension() {
            ext if ext.is_empty() => "mp4".to_string(),
            ext => ext,
        };
        format!(
            "{}-{}-{}.{}",
            slug.trim_end_matches('-'),
            (window.padded_start() * 1000.0).round() as u64,
            (window.padded_end() * 1000.0).round() as u64,
            extension
        )
    }

    fn media_key(request: &SliceRequest) -> String {
        let id = request.media_id.trim();
        if id.is_empty() {
            "media".to_string()
        } else {
            id.replace(['/', '\\'], "_")
        }
    }

    fn cleanup(staged: StagedOutput) {
        if let Err(err) = staged.discard() {
            warn!("{}", err);
        }
    }

    fn failed(
        request: &SliceRequest,
        window: ExpressionWindow,
        stage: SliceStage,
        err: DomainError,
    ) -> SliceResult {
        error!(
            expression = %request.expression_text,
            stage = %stage,
            "Slice failed: {}",
            err
        );
        SliceResult::failure(&request.expression_text, window, stage, &err)
    }
}
