//! API-level constants

/// Multipart field name carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Longest filename kept from a multipart part, in UTF-8 bytes (filesystem NAME_MAX).
pub const MAX_FILENAME_BYTES: usize = 255;

/// Timeout for the storage probe in `/health`.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Rate limiter window.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// How often expired rate limit buckets are dropped.
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Number of proxies trusted in front of the server when reading `X-Forwarded-For`.
pub const TRUSTED_PROXY_COUNT: usize = 1;

/// Room for multipart boundaries and part headers on top of the batch ceiling.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;
