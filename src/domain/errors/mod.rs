// Domain errors - Error taxonomy shared by every layer of the media core

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Inspection exceeded its deadline
    #[error("Probe timed out after {timeout_secs}s: {path}")]
    ProbeTimeout { path: String, timeout_secs: u64 },

    /// Inspected file or the inspection binary is missing
    #[error("Probe target not found: {0}")]
    ProbeNotFound(String),

    /// Inspection output could not be interpreted
    #[error("Malformed probe output for {path}: {reason}")]
    ProbeMalformed { path: String, reason: String },

    /// File or binary is not accessible
    #[error("Access denied while probing: {0}")]
    ProbeAccessDenied(String),

    /// Inputs cannot be joined in copy mode; triggers fallback, never surfaced
    #[error("Inputs are not copy-compatible: {0}")]
    CompositionIncompatible(String),

    /// Both the primary join path and its fallback failed
    #[error("Composition failed: primary attempt: {primary}; fallback attempt: {fallback}")]
    CompositionFatal { primary: String, fallback: String },

    /// External trim process failed while slicing an expression
    #[error("Slice of \"{expression}\" failed: {reason}")]
    SliceToolFailure { expression: String, reason: String },

    /// Removing a partial slice output failed
    #[error("Failed to clean up {path}: {reason}")]
    SliceCleanupFailure { path: String, reason: String },

    /// External encode/trim tool exited unsuccessfully
    #[error("{tool} exited with {}: {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Storage handoff failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Work was cancelled before it completed
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl DomainError {
    /// Whether a join that failed with this error may be retried on the other path
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::CompositionIncompatible(_)
                | DomainError::ToolFailure { .. }
                | DomainError::ProbeMalformed { .. }
        )
    }

    /// Whether this error originated in the probing stage
    pub fn is_probe_error(&self) -> bool {
        matches!(
            self,
            DomainError::ProbeTimeout { .. }
                | DomainError::ProbeNotFound(_)
                | DomainError::ProbeMalformed { .. }
                | DomainError::ProbeAccessDenied(_)
        )
    }

    /// Map a filesystem error raised while stat-ing a probe target
    pub fn from_probe_io(path: &str, error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => DomainError::ProbeNotFound(path.to_string()),
            _ => DomainError::ProbeAccessDenied(format!("{}: {}", path, error)),
        }
    }
}
