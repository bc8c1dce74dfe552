//! ProfeGo Core Library
//!
//! This crate provides the domain models, error types, configuration and constants
//! shared by the storage, processing and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ConverterBackend, IdentityConfig, IngestConfig, ServerConfig, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    extension_of, file_type_label, processed_name, size_mb, FileError, FileErrorKind, FileInfo,
    ProcessingResult, Tier, PROCESSED_TYPE_LABEL,
};
pub use storage_types::StorageBackend;
