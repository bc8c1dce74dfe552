//! ProfeGo Storage Library
//!
//! This crate provides the storage abstraction, its S3 and local filesystem
//! implementations, and the tier-aware [`ArtifactStore`] used by the ingestion pipeline.
//!
//! # Storage key format
//!
//! Every artifact belongs to one user and one tier:
//!
//! - **Originals**: `users/{user}/uploads/{filename}`
//! - **Processed text**: `users/{user}/processed/{filename}`
//!
//! `{user}` is the percent-encoded identity (see [`keys::user_segment`]). Keys never contain
//! `..` or a leading `/`. Key generation lives in the `keys` module so all backends
//! agree on the layout.

pub mod artifacts;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use artifacts::{ArtifactStore, ArtifactSummary, StoredArtifact, TierUsage, UserUsage};
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use profego_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectMeta, Storage, StorageError, StorageResult};
