mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{files_under, FakeMediaTool, Harness, MediaSpec};
use phrasecut::domain::errors::DomainError;
use phrasecut::domain::model::{AlignmentSource, SliceRequest, SliceStage, WordTimestamp};
use phrasecut::ports::{NoTranscript, TranscriptPort};
use phrasecut::AppContainer;

struct StaticTranscript(Vec<WordTimestamp>);

#[async_trait]
impl TranscriptPort for StaticTranscript {
    async fn transcript_for(&self, _media_path: &Path) -> Result<Option<Vec<WordTimestamp>>, DomainError> {
        Ok(Some(self.0.clone()))
    }
}

fn scene_transcript() -> Arc<dyn TranscriptPort> {
    Arc::new(StaticTranscript(vec![
        WordTimestamp::new("Well,", 100.0, 100.3),
        WordTimestamp::new("you", 100.4, 100.6),
        WordTimestamp::new("should", 100.7, 101.0),
        WordTimestamp::new("break", 102.0, 102.4),
        WordTimestamp::new("a", 102.5, 102.6),
        WordTimestamp::new("leg", 102.7, 103.0),
        WordTimestamp::new("tonight.", 103.1, 103.6),
    ]))
}

fn talk_tool() -> FakeMediaTool {
    FakeMediaTool::new().with_media("talk.mp4", MediaSpec::h264(600.0, 1280, 720))
}

#[tokio::test]
async fn test_slice_aligns_to_transcript_and_publishes() {
    let harness = Harness::with(talk_tool(), |_| {}, scene_transcript());
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let request = SliceRequest::new(&media, "Break a leg!", 101.5, 104.0, "talk");
    let result = slicer.slice_one(&request).await;

    assert!(result.succeeded, "{:?}", result.error);
    assert_eq!(result.window.source, AlignmentSource::Transcript);
    assert!(result.window.confidence >= 0.85);
    assert_eq!(result.window.start_seconds, 102.0);
    assert_eq!(result.window.end_seconds, 103.0);

    let stored = Path::new(result.output.as_deref().unwrap()).to_path_buf();
    assert!(stored.exists());
    assert!(stored.starts_with(harness.path("store").join("talk")));
    assert!(stored
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("break-a-leg-"));
    assert!(files_under(&harness.path("work")).is_empty());

    let invocation = &harness.tool.invocations()[0];
    assert_eq!(invocation.inputs[0].options, vec!["-ss", "00:01:41.800"]);
    assert_eq!(invocation.args.value_of("-t"), Some("00:00:01.400"));
    assert_eq!(invocation.args.values_of("-map"), vec!["0:v:0", "0:a:0"]);
    assert_eq!(invocation.args.value_of("-avoid_negative_ts"), Some("make_zero"));
}

#[tokio::test]
async fn test_unrelated_transcript_keeps_subtitle_window() {
    let harness = Harness::with(talk_tool(), |_| {}, scene_transcript());
    let media = harness.media("talk.mp4");

    let request = SliceRequest::new(&media, "gonna get screwed", 101.5, 104.0, "talk");
    let result = harness.container.slicer().slice_one(&request).await;

    assert!(result.succeeded);
    assert_eq!(result.window.source, AlignmentSource::SubtitleFallback);
    assert_eq!(result.window.confidence, 0.5);
    assert_eq!(result.window.start_seconds, 101.5);
    assert_eq!(result.window.end_seconds, 104.0);
}

#[tokio::test]
async fn test_failed_trim_leaves_no_files() {
    let harness = Harness::new(talk_tool().failing_when(|_| true));
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let result = slicer
        .slice_one(&SliceRequest::new(&media, "break a leg", 10.0, 12.0, "talk"))
        .await;

    assert!(!result.succeeded);
    assert_eq!(result.failed_stage, Some(SliceStage::Trim));
    assert!(result.error.as_deref().unwrap().contains("trim stage"));
    assert!(files_under(&harness.path("work")).is_empty());
    assert!(files_under(&harness.path("store")).is_empty());
    assert_eq!(slicer.available_permits(), slicer.concurrency_limit());
}

#[tokio::test]
async fn test_empty_trim_output_is_not_published() {
    let harness = Harness::new(talk_tool().writing_nothing());
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let result = slicer
        .slice_one(&SliceRequest::new(&media, "break a leg", 10.0, 12.0, "talk"))
        .await;

    assert!(!result.succeeded);
    assert!(result.output.is_none());
    assert_eq!(result.failed_stage, Some(SliceStage::Trim));
    assert!(result.error.as_deref().unwrap().contains("empty file"));
    assert!(files_under(&harness.path("work")).is_empty());
    assert!(files_under(&harness.path("store")).is_empty());
}

#[tokio::test]
async fn test_trim_output_missing_audio_is_not_published() {
    let tool = talk_tool().with_output(|_| Some(MediaSpec::h264(1.4, 1280, 720).without_audio()));
    let harness = Harness::new(tool);
    let media = harness.media("talk.mp4");

    let result = harness
        .container
        .slicer()
        .slice_one(&SliceRequest::new(&media, "break a leg", 10.0, 12.0, "talk"))
        .await;

    assert!(!result.succeeded);
    assert_eq!(result.failed_stage, Some(SliceStage::Trim));
    assert!(result.error.as_deref().unwrap().contains("audio stream missing"));
    assert!(files_under(&harness.path("store")).is_empty());
}

#[tokio::test]
async fn test_invalid_requests_fail_in_their_stage() {
    let harness = Harness::new(talk_tool());
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let empty = slicer
        .slice_one(&SliceRequest::new(&media, "  ", 1.0, 2.0, "talk"))
        .await;
    assert_eq!(empty.failed_stage, Some(SliceStage::Validate));

    let past_end = slicer
        .slice_one(&SliceRequest::new(&media, "the end", 700.0, 702.0, "talk"))
        .await;
    assert_eq!(past_end.failed_stage, Some(SliceStage::Validate));

    let missing = slicer
        .slice_one(&SliceRequest::new(harness.path("nope.mp4"), "hello", 1.0, 2.0, "nope"))
        .await;
    assert_eq!(missing.failed_stage, Some(SliceStage::Probe));

    assert!(harness.tool.invocations().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_respects_concurrency_limit_and_order() {
    let tool = talk_tool().with_run_delay(Duration::from_millis(50));
    let harness = Harness::with(tool, |c| c.slicer.max_concurrency = Some(2), Arc::new(NoTranscript));
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let requests: Vec<SliceRequest> = (0..8)
        .map(|i| {
            let start = 10.0 * i as f64 + 1.0;
            SliceRequest::new(&media, &format!("line {}", i), start, start + 2.0, "talk")
        })
        .collect();
    let manifest = slicer.slice_many(requests).await;

    assert_eq!(manifest.succeeded, 8);
    assert_eq!(manifest.failed, 0);
    assert!(!manifest.cancelled);
    for (i, result) in manifest.results.iter().enumerate() {
        assert_eq!(result.expression_text, format!("line {}", i));
    }
    assert!(harness.tool.max_concurrent_runs() <= 2);
    assert!(harness.tool.max_concurrent_runs() >= 1);
    assert_eq!(harness.tool.invocations().len(), 8);
    assert_eq!(slicer.available_permits(), 2);
    assert_eq!(files_under(&harness.path("store")).len(), 8);
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let tool = talk_tool().failing_when(|invocation| {
        invocation.inputs[0].options.iter().any(|o| o == "00:00:20.800")
    });
    let harness = Harness::new(tool);
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();

    let requests = vec![
        SliceRequest::new(&media, "first", 1.0, 2.0, "talk"),
        SliceRequest::new(&media, "second", 21.0, 22.0, "talk"),
        SliceRequest::new(&media, "third", 41.0, 42.0, "talk"),
    ];
    let manifest = slicer.slice_many(requests).await;

    assert_eq!(manifest.succeeded, 2);
    assert_eq!(manifest.failed, 1);
    assert!(manifest.results[0].succeeded);
    assert_eq!(manifest.results[1].failed_stage, Some(SliceStage::Trim));
    assert!(manifest.results[2].succeeded);
    assert!(files_under(&harness.path("work")).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_batch_releases_every_slot() {
    let tool = talk_tool().with_run_delay(Duration::from_secs(30));
    let harness = Harness::with(tool, |c| c.slicer.max_concurrency = Some(2), Arc::new(NoTranscript));
    let media = harness.media("talk.mp4");
    let slicer = harness.container.slicer();
    let before = slicer.available_permits();

    let requests: Vec<SliceRequest> = (0..5)
        .map(|i| SliceRequest::new(&media, &format!("line {}", i), 5.0 * i as f64, 5.0 * i as f64 + 1.0, "talk"))
        .collect();
    let manifest = slicer
        .slice_many_until(requests, tokio::time::sleep(Duration::from_millis(200)))
        .await;

    assert!(manifest.cancelled);
    assert_eq!(manifest.succeeded, 0);
    assert_eq!(manifest.results.len(), 5);
    assert!(manifest
        .results
        .iter()
        .all(|r| r.failed_stage == Some(SliceStage::Cancelled)));
    assert_eq!(slicer.available_permits(), before);
    assert_eq!(harness.tool.running(), 0);
    assert!(files_under(&harness.path("work")).is_empty());
    assert!(files_under(&harness.path("store")).is_empty());
}
