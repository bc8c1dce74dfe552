//! Temporary on-disk staging of submitted bytes.
//!
//! A [`StagedFile`] owns its temp file: dropping it removes the file, whatever path
//! the caller leaves by (return, `?`, panic, or a cancelled future).

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;

const STAGED_PREFIX: &str = "profego-";

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to stage file: {0}")]
    Io(#[from] io::Error),

    #[error("Staging task failed: {0}")]
    TaskFailed(String),
}

/// A file's bytes written to a uniquely named temp file.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    size_bytes: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Remove the temp file now and report whether that worked.
    pub fn release(self) -> io::Result<()> {
        self.file.close()
    }
}

#[async_trait]
pub trait Staging: Send + Sync {
    /// Write `data` to a fresh temp file whose name ends with `suffix`.
    async fn stage(&self, data: Bytes, suffix: &str) -> Result<StagedFile, StagingError>;
}

/// Stages files in a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct TempStaging {
    dir: PathBuf,
}

impl TempStaging {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Staging for TempStaging {
    async fn stage(&self, data: Bytes, suffix: &str) -> Result<StagedFile, StagingError> {
        let dir = self.dir.clone();
        let suffix = suffix.to_string();

        tokio::task::spawn_blocking(move || -> Result<StagedFile, StagingError> {
            std::fs::create_dir_all(&dir)?;
            let mut file = tempfile::Builder::new()
                .prefix(STAGED_PREFIX)
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(StagedFile {
                file,
                size_bytes: data.len() as u64,
            })
        })
        .await
        .map_err(|e| StagingError::TaskFailed(e.to_string()))?
    }
}
