//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe` as a subprocess with a deadline and returns its JSON report.
//! The child is killed if the deadline passes or the future is dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::stderr_tail;

/// Arguments producing `{format, streams[]}` JSON
const PROBE_ARGS: &[&str] = &[
    "-v",
    "error",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

/// FFprobe-based inspector
pub struct FfprobeTool {
    binary: PathBuf,
}

impl FfprobeTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Inspect `path`, returning ffprobe's JSON report
    pub async fn inspect(&self, path: &Path, timeout: Duration) -> Result<String, DomainError> {
        let target = path.display().to_string();
        let mut command = Command::new(&self.binary);
        command
            .args(PROBE_ARGS)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %self.binary.display(), path = %target, "Spawning inspector");

        let child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => DomainError::ProbeNotFound(format!(
                "inspector binary {} is not installed",
                self.binary.display()
            )),
            ErrorKind::PermissionDenied => DomainError::ProbeAccessDenied(format!(
                "cannot execute {}: {}",
                self.binary.display(),
                e
            )),
            _ => DomainError::ProbeMalformed {
                path: target.clone(),
                reason: format!("failed to launch {}: {}", self.binary.display(), e),
            },
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                return Err(DomainError::ProbeTimeout {
                    path: target,
                    timeout_secs: timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(DomainError::ProbeMalformed {
                    path: target,
                    reason: format!("failed to wait for inspector: {}", e),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(&target, &stderr));
        }

        String::from_utf8(output.stdout).map_err(|e| DomainError::ProbeMalformed {
            path: target,
            reason: format!("inspector output is not UTF-8: {}", e),
        })
    }

    fn classify_failure(path: &str, stderr: &str) -> DomainError {
        if stderr.contains("No such file or directory") {
            DomainError::ProbeNotFound(path.to_string())
        } else if stderr.contains("Permission denied") {
            DomainError::ProbeAccessDenied(path.to_string())
        } else {
            DomainError::ProbeMalformed {
                path: path.to_string(),
                reason: stderr_tail(stderr.trim(), 5),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            FfprobeTool::classify_failure("a.mp4", "a.mp4: No such file or directory"),
            DomainError::ProbeNotFound("a.mp4".to_string())
        );
        assert!(matches!(
            FfprobeTool::classify_failure("a.mp4", "a.mp4: Permission denied"),
            DomainError::ProbeAccessDenied(_)
        ));
        assert!(matches!(
            FfprobeTool::classify_failure("a.mp4", "Invalid data found when processing input"),
            DomainError::ProbeMalformed { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let tool = FfprobeTool::new("/nonexistent/phrasecut-ffprobe");
        let err = tool
            .inspect(Path::new("clip.mp4"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProbeNotFound(_)));
    }
}
