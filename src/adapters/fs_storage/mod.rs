// Filesystem storage adapter - Publishes artifacts under a local root directory

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::*;
use crate::output::StagedOutput;
use crate::ports::*;

/// Stores artifacts at `root/<logical key>`
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination for a logical key; keys may not escape the root
    pub fn destination(&self, logical_key: &str) -> Result<PathBuf, DomainError> {
        let key = Path::new(logical_key);
        let escapes = key
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if logical_key.trim().is_empty() || escapes {
            return Err(DomainError::Storage(format!(
                "Invalid storage key: {}",
                logical_key
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StoragePort for FsStorage {
    async fn store(&self, local_path: &Path, logical_key: &str) -> Result<String, DomainError> {
        let destination = self.destination(logical_key)?;
        let staged = StagedOutput::create(&destination)?;

        tokio::fs::copy(local_path, staged.path())
            .await
            .map_err(|e| {
                DomainError::Storage(format!(
                    "Failed to copy {} into storage: {}",
                    local_path.display(),
                    e
                ))
            })?;

        let published = staged.commit()?;
        info!("Stored artifact: {}", published.display());
        Ok(published.display().to_string())
    }
}
