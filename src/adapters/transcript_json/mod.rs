// JSON transcript adapter - Reads word-level transcripts produced by an ASR step

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Either a bare word list or an object with a `words` field
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Words(Vec<WordTimestamp>),
    Document { words: Vec<WordTimestamp> },
}

/// Reads `<media stem>.words.json` next to the media, or one explicit file
pub struct JsonTranscriptProvider {
    explicit: Option<PathBuf>,
}

impl JsonTranscriptProvider {
    /// Look for a sidecar file next to each media file
    pub fn sidecar() -> Self {
        Self { explicit: None }
    }

    /// Use one transcript file for every media file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
        }
    }

    pub fn transcript_path(&self, media_path: &Path) -> PathBuf {
        match &self.explicit {
            Some(path) => path.clone(),
            None => media_path.with_extension("words.json"),
        }
    }

    /// Parse transcript JSON
    pub fn parse(path: &Path, content: &str) -> Result<Vec<WordTimestamp>, DomainError> {
        let parsed: TranscriptFile = serde_json::from_str(content).map_err(|e| {
            DomainError::BadArgs(format!("Invalid transcript {}: {}", path.display(), e))
        })?;
        let mut words = match parsed {
            TranscriptFile::Words(words) | TranscriptFile::Document { words } => words,
        };
        words.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        Ok(words)
    }
}

#[async_trait]
impl TranscriptPort for JsonTranscriptProvider {
    async fn transcript_for(
        &self,
        media_path: &Path,
    ) -> Result<Option<Vec<WordTimestamp>>, DomainError> {
        let path = self.transcript_path(media_path);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.explicit.is_none() => {
                debug!("No transcript sidecar at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(DomainError::BadArgs(format!(
                    "Cannot read transcript {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::parse(&path, &content).map(Some)
    }
}
