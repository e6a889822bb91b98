//! CLI module for phrasecut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config_initialization::CliOverrides;

pub mod args;
pub mod commands;

pub use args::{BatchArgs, ConcatArgs, GainArgs, ProbeArgs, RepeatArgs, SliceArgs, StackArgs};

/// phrasecut media core
///
/// Cuts spoken expressions out of long-form media and composes the resulting
/// clips. Results are printed to stdout as JSON; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "phrasecut")]
#[command(about = "Expression slicing and clip composition over ffmpeg")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: phrasecut.toml or config/phrasecut.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Maximum concurrent trim processes
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Root directory for published slices
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
            max_concurrency: self.max_concurrency.map(|n| n as usize),
            storage_root: self.storage_root.clone(),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print probed media metadata
    Probe(ProbeArgs),
    /// Cut one expression out of a media file
    Slice(SliceArgs),
    /// Cut every expression listed in a JSON request file
    Batch(BatchArgs),
    /// Join clips end to end
    Concat(ConcatArgs),
    /// Join a clip with itself N times
    Repeat(RepeatArgs),
    /// Place two clips side by side
    Hstack(StackArgs),
    /// Place two clips one above the other
    Vstack(StackArgs),
    /// Re-encode audio with a volume multiplier
    Gain(GainArgs),
}

impl Commands {
    /// Explicit transcript file, for commands that align expressions
    pub fn transcript(&self) -> Option<&Path> {
        match self {
            Commands::Slice(args) => args.transcript.as_deref(),
            Commands::Batch(args) => args.transcript.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "phrasecut",
            "probe",
            "--input",
            "talk.mp4",
            "--log-level",
            "debug",
            "--max-concurrency",
            "4",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.max_concurrency, Some(4));
        assert!(!overrides.json_logs);
    }

    #[test]
    fn test_transcript_only_for_slicing_commands() {
        let cli = Cli::try_parse_from([
            "phrasecut",
            "slice",
            "--input",
            "talk.mp4",
            "--expression",
            "break a leg",
            "--start",
            "1:02.5",
            "--end",
            "64",
            "--transcript",
            "talk.words.json",
        ])
        .unwrap();
        assert_eq!(cli.command.transcript(), Some(Path::new("talk.words.json")));

        let cli = Cli::try_parse_from(["phrasecut", "repeat", "-i", "a.mp4", "-n", "3", "-o", "b.mp4"])
            .unwrap();
        assert!(cli.command.transcript().is_none());
    }

    #[test]
    fn test_repeat_count_must_be_positive() {
        assert!(
            Cli::try_parse_from(["phrasecut", "repeat", "-i", "a.mp4", "-n", "0", "-o", "b.mp4"])
                .is_err()
        );
    }
}
