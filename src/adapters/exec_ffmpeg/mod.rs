//! FFmpeg execution adapter
//!
//! Runs planned invocations as `ffmpeg` subprocesses and captures stderr for
//! diagnostics. Dropping the returned future kills the process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Flags placed before every invocation
const GLOBAL_ARGS: &[&str] = &["-hide_banner", "-nostdin", "-y", "-loglevel", "error"];

/// FFmpeg-based executor
pub struct FfmpegTool {
    binary: PathBuf,
}

impl FfmpegTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Full argument vector for an invocation
    pub fn command_args(invocation: &ToolInvocation) -> Vec<String> {
        GLOBAL_ARGS
            .iter()
            .map(|a| a.to_string())
            .chain(invocation.to_command_args())
            .collect()
    }

    /// Run to completion; a non-zero exit is reported in the outcome
    pub async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome, DomainError> {
        let started = Instant::now();
        let tool = self.binary.display().to_string();

        let child = Command::new(&self.binary)
            .args(Self::command_args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::ToolFailure {
                tool: tool.clone(),
                exit_code: None,
                stderr: format!("failed to launch: {}", e),
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DomainError::ToolFailure {
                tool: tool.clone(),
                exit_code: None,
                stderr: format!("failed to wait: {}", e),
            })?;

        debug!(
            output = %invocation.output.display(),
            exit_code = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Encoder finished"
        );

        Ok(ToolOutcome {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
