// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_storage;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;
pub mod transcript_json;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::config::ToolSettings;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

// Re-export adapters
pub use exec_ffmpeg::FfmpegTool;
pub use fs_storage::FsStorage;
pub use probe_ffprobe::FfprobeTool;
pub use toml_config::TomlConfigLoader;
pub use tracing_log::init_logging;
pub use transcript_json::JsonTranscriptProvider;

/// `ffprobe` for inspection and `ffmpeg` for everything else
pub struct FfmpegToolchain {
    inspector: FfprobeTool,
    executor: FfmpegTool,
}

impl FfmpegToolchain {
    pub fn new(inspector: FfprobeTool, executor: FfmpegTool) -> Self {
        Self {
            inspector,
            executor,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self::new(
            FfprobeTool::new(&settings.ffprobe),
            FfmpegTool::new(&settings.ffmpeg),
        )
    }
}

#[async_trait]
impl MediaToolPort for FfmpegToolchain {
    async fn inspect(&self, path: &Path, timeout: Duration) -> Result<String, DomainError> {
        self.inspector.inspect(path, timeout).await
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome, DomainError> {
        self.executor.run(invocation).await
    }
}
