//! Shared constants

/// Per-file size ceiling in MiB when `MAX_FILE_SIZE_MB` is not set.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 20;

/// Extensions accepted by the ingestion pipeline, lowercase and without the dot.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "jpg", "jpeg", "png", "xlsx", "xls", "csv", "json", "xml",
];

/// Suffix appended to the stem of an original file to name its processed text artifact.
pub const PROCESSED_SUFFIX: &str = "_procesado.txt";

/// Minimum password length accepted at registration and login.
pub const MIN_PASSWORD_LENGTH: u64 = 6;

pub const BYTES_PER_MIB: u64 = 1024 * 1024;
