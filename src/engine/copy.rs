//! Copy-mode joins through the concat demuxer

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeArgs, InputSpec, MediaMetadata, ToolInvocation};

/// Builds container-level joins that never re-encode
pub struct CopyJoiner;

impl CopyJoiner {
    /// Write the demuxer list file referencing every input in order
    pub fn write_list(inputs: &[MediaMetadata]) -> Result<NamedTempFile, DomainError> {
        let mut list = tempfile::Builder::new()
            .prefix("phrasecut-concat-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| DomainError::Storage(format!("Cannot create concat list: {}", e)))?;

        list.write_all(Self::list_contents(inputs).as_bytes())
            .and_then(|_| list.flush())
            .map_err(|e| DomainError::Storage(format!("Cannot write concat list: {}", e)))?;
        Ok(list)
    }

    /// One `file '<path>'` line per input
    pub fn list_contents(inputs: &[MediaMetadata]) -> String {
        inputs
            .iter()
            .map(|m| format!("file '{}'\n", Self::escape(&m.path.to_string_lossy())))
            .collect()
    }

    /// Invocation joining the list at container level, with explicit stream selection
    pub fn invocation(list: &Path, inputs: &[MediaMetadata], output: &Path) -> ToolInvocation {
        let has_video = inputs.first().is_some_and(MediaMetadata::has_video);
        let has_audio = inputs.first().is_some_and(MediaMetadata::has_audio);

        let mut args = EncodeArgs::new();
        if has_video {
            args = args.opt("-map", "0:v:0");
        }
        if has_audio {
            args = args.opt("-map", "0:a:0");
        }
        args = args.opt("-c", "copy");

        ToolInvocation::new(
            vec![InputSpec::with_options(list, &["-f", "concat", "-safe", "0"])],
            args,
            output,
        )
    }

    // The list syntax closes the quote, emits an escaped quote, and reopens
    fn escape(path: &str) -> String {
        path.replace('\'', "'\\''")
    }
}
