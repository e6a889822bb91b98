//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::JsonTranscriptProvider;
use crate::app::{AppContainer, BatchManifest, DefaultAppContainer};
use crate::cli::args::{BatchArgs, ConcatArgs, GainArgs, ProbeArgs, RepeatArgs, SliceArgs, StackArgs};
use crate::cli::Commands;
use crate::domain::config::CoreConfig;
use crate::domain::model::{SliceRequest, TimeSpec};
use crate::engine::{CompositionOutput, StackAxis};
use crate::error::PhraseCutError;
use crate::ports::TranscriptPort;

/// Build the container for `command` and run it
pub async fn execute(command: Commands, config: CoreConfig) -> Result<()> {
    let transcripts: Arc<dyn TranscriptPort> = match command.transcript() {
        Some(path) => Arc::new(JsonTranscriptProvider::from_file(path)),
        None => Arc::new(JsonTranscriptProvider::sidecar()),
    };
    let container = DefaultAppContainer::with_transcripts(config, transcripts)?;

    match command {
        Commands::Probe(args) => probe(&container, args).await,
        Commands::Slice(args) => slice(&container, args).await,
        Commands::Batch(args) => batch(&container, args).await,
        Commands::Concat(args) => concat(&container, args).await,
        Commands::Repeat(args) => repeat(&container, args).await,
        Commands::Hstack(args) => stack(&container, StackAxis::Horizontal, args).await,
        Commands::Vstack(args) => stack(&container, StackAxis::Vertical, args).await,
        Commands::Gain(args) => gain(&container, args).await,
    }
}

/// Execute the probe command
pub async fn probe(container: &DefaultAppContainer, args: ProbeArgs) -> Result<()> {
    let metadata = container
        .probe_cache()
        .get(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;
    print_json(&metadata)
}

/// Execute the slice command
pub async fn slice(container: &DefaultAppContainer, args: SliceArgs) -> Result<()> {
    let start = parse_time(&args.start)?;
    let end = parse_time(&args.end)?;
    let media_id = args
        .media_id
        .clone()
        .unwrap_or_else(|| file_stem(&args.input));

    let request = SliceRequest::new(&args.input, &args.expression, start, end, &media_id);
    let result = container.slicer().slice_one(&request).await;
    print_json(&result)?;

    match result.error {
        Some(reason) => bail!("Slice failed: {}", reason),
        None => Ok(()),
    }
}

/// Execute the batch command; Ctrl-C cancels outstanding slices
pub async fn batch(container: &DefaultAppContainer, args: BatchArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.requests)
        .with_context(|| format!("Failed to read {}", args.requests.display()))?;
    let requests: Vec<SliceRequest> = serde_json::from_str(&content)
        .map_err(PhraseCutError::from)
        .with_context(|| format!("Invalid request file {}", args.requests.display()))?;
    info!("Loaded {} slice requests", requests.len());

    let slicer = container.slicer();
    let manifest: BatchManifest = slicer
        .slice_many_until(requests, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    print_json(&manifest)?;

    if manifest.cancelled {
        bail!("Batch cancelled after {} slices", manifest.succeeded);
    }
    if manifest.failed > 0 {
        bail!(
            "{} of {} slices failed",
            manifest.failed,
            manifest.results.len()
        );
    }
    Ok(())
}

/// Execute the concat command
pub async fn concat(container: &DefaultAppContainer, args: ConcatArgs) -> Result<()> {
    let output = container
        .composition_engine()
        .concat(&args.inputs, &args.output)
        .await?;
    report(&output)
}

/// Execute the repeat command
pub async fn repeat(container: &DefaultAppContainer, args: RepeatArgs) -> Result<()> {
    let output = container
        .composition_engine()
        .repeat(&args.input, args.count as usize, &args.output)
        .await?;
    report(&output)
}

/// Execute the hstack and vstack commands
pub async fn stack(container: &DefaultAppContainer, axis: StackAxis, args: StackArgs) -> Result<()> {
    let output = container
        .composition_engine()
        .stack(axis, &args.primary, &args.secondary, &args.output)
        .await?;
    report(&output)
}

/// Execute the gain command
pub async fn gain(container: &DefaultAppContainer, args: GainArgs) -> Result<()> {
    let output = container
        .composition_engine()
        .apply_final_audio_gain(&args.input, args.factor, &args.output)
        .await?;
    report(&output)
}

fn report(output: &CompositionOutput) -> Result<()> {
    if output.used_fallback() {
        info!("{} written after fallback to {} mode", output.path.display(), output.mode);
    }
    print_json(output)
}

fn parse_time(value: &str) -> Result<f64> {
    let time = TimeSpec::parse(value).map_err(|_| PhraseCutError::InvalidTimeFormat {
        time: value.to_string(),
    })?;
    Ok(time.seconds)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(PhraseCutError::from)?;
    println!("{}", rendered);
    Ok(())
}
