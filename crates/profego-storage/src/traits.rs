//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata of one stored object, as returned by [`Storage::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full storage key.
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

impl ObjectMeta {
    /// Last path segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait, so the artifact
/// store works with any backend without knowing where the bytes end up.
///
/// Writes to an existing key overwrite it (last write wins).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key`, replacing any previous object.
    async fn put(&self, storage_key: &str, data: Bytes) -> StorageResult<()>;

    /// Fetch an object. Missing objects yield [`StorageError::NotFound`].
    async fn get(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Delete an object. Missing objects yield [`StorageError::NotFound`].
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// List the objects directly or transitively under `prefix`.
    ///
    /// Order is whatever the backend produces; callers must not rely on it.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Make sure a key prefix can receive objects.
    ///
    /// Backends with real directories create them; flat object stores treat this as a no-op.
    async fn ensure_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// Cheap connectivity probe used by the health endpoint.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_meta_name() {
        let meta = ObjectMeta {
            key: "users/a/uploads/report.pdf".to_string(),
            size_bytes: 3,
            last_modified: Utc::now(),
        };
        assert_eq!(meta.name(), "report.pdf");
    }
}
