// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for the external media inspect and encode tools
#[async_trait]
pub trait MediaToolPort: Send + Sync {
    /// Inspect a media file and return the tool's raw JSON report (`format` + `streams[]`).
    ///
    /// Timeouts, missing binaries and non-zero exits are reported as probe errors.
    async fn inspect(&self, path: &Path, timeout: Duration) -> Result<String, DomainError>;

    /// Run an encode/trim invocation to completion.
    ///
    /// A non-zero exit is reported through `ToolOutcome`, not as an error;
    /// errors are reserved for failures to launch or wait on the process.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome, DomainError>;
}

/// Port for publishing finished artifacts
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Store the file at `local_path` under `logical_key` and return a reference to it.
    ///
    /// The caller keeps ownership of `local_path` and deletes it afterwards.
    async fn store(&self, local_path: &Path, logical_key: &str) -> Result<String, DomainError>;
}

/// Port for word-level transcripts produced elsewhere
#[async_trait]
pub trait TranscriptPort: Send + Sync {
    /// Transcript words for a media file, or `None` when no transcript exists
    async fn transcript_for(
        &self,
        media_path: &Path,
    ) -> Result<Option<Vec<WordTimestamp>>, DomainError>;
}

/// Transcript provider that never has a transcript; every window falls back
pub struct NoTranscript;

#[async_trait]
impl TranscriptPort for NoTranscript {
    async fn transcript_for(
        &self,
        _media_path: &Path,
    ) -> Result<Option<Vec<WordTimestamp>>, DomainError> {
        Ok(None)
    }
}
