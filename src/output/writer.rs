//! Staged output files
//!
//! Every artifact is written to a hidden `.partial-*` file next to its final
//! destination and renamed into place only once it is complete. A staged file
//! that is dropped without being committed is deleted.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::debug;

use crate::domain::errors::DomainError;

/// A not-yet-published output file
#[derive(Debug)]
pub struct StagedOutput {
    temp: TempPath,
    destination: PathBuf,
}

impl StagedOutput {
    /// Stage an output for `destination`, creating its directory if needed
    pub fn create(destination: &Path) -> Result<Self, DomainError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            DomainError::Storage(format!(
                "Cannot create output directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        // Keep the extension so the encoder picks the right muxer
        let suffix = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| {
                DomainError::Storage(format!(
                    "Cannot stage output in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        let temp = file.into_temp_path();
        debug!(staged = %temp.display(), destination = %destination.display(), "Staged output");

        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
        })
    }

    /// Path the encoder writes to
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically move the staged file to its destination, replacing any existing file
    pub fn commit(self) -> Result<PathBuf, DomainError> {
        let destination = self.destination;
        self.temp.persist(&destination).map_err(|e| {
            DomainError::Storage(format!(
                "Cannot publish {}: {}",
                destination.display(),
                e.error
            ))
        })?;
        Ok(destination)
    }

    /// Delete the staged file, reporting a failed removal
    pub fn discard(self) -> Result<(), DomainError> {
        let path = self.temp.to_path_buf();
        self.temp.close().map_err(|e| DomainError::SliceCleanupFailure {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_stage_keeps_extension_and_hides_file() {
        let dir = TempDir::new().unwrap();
        let staged = StagedOutput::create(&dir.path().join("out.mp4")).unwrap();
        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".partial-"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(staged.path().parent(), Some(dir.path()));
    }

    #[test]
    fn test_commit_moves_into_place() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("nested").join("out.mp4");
        let staged = StagedOutput::create(&destination).unwrap();
        std::fs::write(staged.path(), b"data").unwrap();

        let published = staged.commit().unwrap();
        assert_eq!(published, destination);
        assert_eq!(std::fs::read(&destination).unwrap(), b"data");
        assert_eq!(entries(&dir.path().join("nested")), vec![destination]);
    }

    #[test]
    fn test_drop_and_discard_remove_staged_file() {
        let dir = TempDir::new().unwrap();
        {
            let staged = StagedOutput::create(&dir.path().join("a.mp4")).unwrap();
            std::fs::write(staged.path(), b"partial").unwrap();
        }
        let staged = StagedOutput::create(&dir.path().join("b.mp4")).unwrap();
        staged.discard().unwrap();
        assert!(entries(dir.path()).is_empty());
    }
}
