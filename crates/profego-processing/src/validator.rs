use profego_core::constants::BYTES_PER_MIB;
use profego_core::{extension_of, IngestConfig};

/// Validation errors for submitted files
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max_mb} MB)")]
    FileTooLarge { size: u64, max: u64, max_mb: u64 },

    #[error("File type not allowed: .{extension}")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File type not allowed: missing extension in '{0}'")]
    MissingExtension(String),
}

/// `true` when `byte_len` does not exceed `ceiling`. Empty files pass.
pub fn check_size(byte_len: u64, ceiling: u64) -> bool {
    byte_len <= ceiling
}

/// Submitted file validator
///
/// Pure checks on name and size; a failure rejects one file, never the batch.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_extensions: Vec<String>,
}

impl FileValidator {
    pub fn new(max_file_size: u64, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
        )
    }

    /// `true` when the lowercased extension is on the allow-list.
    pub fn check_extension(&self, filename: &str) -> bool {
        self.validate_extension(filename).is_ok()
    }

    pub fn check_size(&self, byte_len: u64) -> bool {
        check_size(byte_len, self.max_file_size)
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = extension_of(filename)
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate file size
    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if !self.check_size(size) {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
                max_mb: self.max_file_size / BYTES_PER_MIB,
            });
        }
        Ok(())
    }
}
