//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media file to inspect
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Arguments for the slice command
#[derive(Args, Debug)]
pub struct SliceArgs {
    /// Source media file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Expression text to locate
    #[arg(short, long)]
    pub expression: String,

    /// Approximate start (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// Approximate end (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long)]
    pub end: String,

    /// Identifier used in the storage key (default: input file stem)
    #[arg(long)]
    pub media_id: Option<String>,

    /// Word-level transcript JSON (default: <input stem>.words.json)
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON array of slice requests
    #[arg(short, long)]
    pub requests: PathBuf,

    /// Word-level transcript JSON used for every request
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

/// Arguments for the concat command
#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Clips to join, in order
    #[arg(short, long, num_args = 1.., required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the repeat command
#[derive(Args, Debug)]
pub struct RepeatArgs {
    /// Clip to repeat
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of copies in the output
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the hstack and vstack commands
#[derive(Args, Debug)]
pub struct StackArgs {
    /// Clip whose geometry and audio are kept
    #[arg(short, long)]
    pub primary: PathBuf,

    /// Clip scaled to match the primary
    #[arg(short, long)]
    pub secondary: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the gain command
#[derive(Args, Debug)]
pub struct GainArgs {
    /// Input clip
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Volume multiplier (default: composition.audio_gain)
    #[arg(short, long)]
    pub factor: Option<f64>,
}
