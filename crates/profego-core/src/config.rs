//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env` through
//! `dotenvy`) and grouped by concern: HTTP server, storage, ingestion and identity.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{BYTES_PER_MIB, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE_MB};
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8000;
const MAX_BATCH_SIZE_MB: u64 = 200;
const INGEST_CONCURRENCY: usize = 1;
const CONVERTER_TIMEOUT_SECS: u64 = 120;
const AUTH_RATE_LIMIT_PER_MINUTE: u32 = 10;
const REGISTER_RATE_LIMIT_PER_MINUTE: u32 = 3;
const UPLOAD_RATE_LIMIT_PER_MINUTE: u32 = 10;
const DELETE_RATE_LIMIT_PER_MINUTE: u32 = 20;
const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const LOCAL_STORAGE_PATH: &str = "./data/storage";

/// Which converter implementation turns staged files into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterBackend {
    /// In-process extraction (PDF, plain text formats, OOXML).
    Builtin,
    /// Remote conversion service reached over HTTP.
    Http,
}

impl FromStr for ConverterBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "builtin" => Ok(ConverterBackend::Builtin),
            "http" => Ok(ConverterBackend::Http),
            _ => Err(anyhow::anyhow!("Invalid converter backend: {}", s)),
        }
    }
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub frontend_dir: Option<PathBuf>,
    pub log_format: String,
    pub login_rate_limit_per_minute: u32,
    pub register_rate_limit_per_minute: u32,
    pub upload_rate_limit_per_minute: u32,
    pub delete_rate_limit_per_minute: u32,
}

/// Storage backend settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
}

/// Ingestion pipeline settings
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub max_batch_size_bytes: u64,
    /// Files of one batch processed at the same time. Results keep submission order.
    pub concurrency: usize,
    pub staging_dir: PathBuf,
    pub converter_backend: ConverterBackend,
    pub converter_url: Option<String>,
    pub converter_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * BYTES_PER_MIB,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_batch_size_bytes: MAX_BATCH_SIZE_MB * BYTES_PER_MIB,
            concurrency: INGEST_CONCURRENCY,
            staging_dir: env::temp_dir(),
            converter_backend: ConverterBackend::Builtin,
            converter_url: None,
            converter_timeout_secs: CONVERTER_TIMEOUT_SECS,
        }
    }
}

/// Identity provider settings
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub firebase_api_key: Option<String>,
    pub identity_base_url: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub identity: IdentityConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    fn inner(&self) -> &AppConfig {
        &self.0
    }

    /// Load `.env` (if present) and read settings from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig::from_lookup(&lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().server.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().server.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().server.cors_origins
    }

    pub fn frontend_dir(&self) -> Option<&PathBuf> {
        self.inner().server.frontend_dir.as_ref()
    }

    pub fn log_format(&self) -> &str {
        &self.inner().server.log_format
    }

    pub fn server(&self) -> &ServerConfig {
        &self.inner().server
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.inner().storage
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage.backend
    }

    pub fn ingest(&self) -> &IngestConfig {
        &self.inner().ingest
    }

    pub fn identity(&self) -> &IdentityConfig {
        &self.inner().identity
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server = ServerConfig {
            server_port: parse_or(lookup, "PORT", SERVER_PORT),
            environment,
            cors_origins,
            frontend_dir: non_empty(lookup, "FRONTEND_DIR").map(PathBuf::from),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "compact".to_string()),
            login_rate_limit_per_minute: parse_or(
                lookup,
                "AUTH_RATE_LIMIT_PER_MINUTE",
                AUTH_RATE_LIMIT_PER_MINUTE,
            ),
            register_rate_limit_per_minute: parse_or(
                lookup,
                "REGISTER_RATE_LIMIT_PER_MINUTE",
                REGISTER_RATE_LIMIT_PER_MINUTE,
            ),
            upload_rate_limit_per_minute: parse_or(
                lookup,
                "UPLOAD_RATE_LIMIT_PER_MINUTE",
                UPLOAD_RATE_LIMIT_PER_MINUTE,
            ),
            delete_rate_limit_per_minute: parse_or(
                lookup,
                "DELETE_RATE_LIMIT_PER_MINUTE",
                DELETE_RATE_LIMIT_PER_MINUTE,
            ),
        };

        let backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };
        let storage = StorageConfig {
            backend,
            local_storage_path: non_empty(lookup, "LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(LOCAL_STORAGE_PATH)),
            s3_bucket: non_empty(lookup, "S3_BUCKET"),
            s3_region: non_empty(lookup, "S3_REGION").or_else(|| non_empty(lookup, "AWS_REGION")),
            s3_endpoint: non_empty(lookup, "S3_ENDPOINT"),
        };

        let defaults = IngestConfig::default();
        let max_file_size_mb = parse_or(lookup, "MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB);
        let max_batch_size_mb = parse_or(lookup, "MAX_BATCH_SIZE_MB", MAX_BATCH_SIZE_MB);
        let allowed_extensions = match non_empty(lookup, "ALLOWED_EXTENSIONS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.allowed_extensions,
        };
        let converter_backend = match lookup("CONVERTER_BACKEND") {
            Some(value) => value.parse::<ConverterBackend>()?,
            None => ConverterBackend::Builtin,
        };
        let ingest = IngestConfig {
            max_file_size_bytes: max_file_size_mb * BYTES_PER_MIB,
            allowed_extensions,
            max_batch_size_bytes: max_batch_size_mb * BYTES_PER_MIB,
            concurrency: parse_or(lookup, "INGEST_CONCURRENCY", INGEST_CONCURRENCY).max(1),
            staging_dir: non_empty(lookup, "STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            converter_backend,
            converter_url: non_empty(lookup, "CONVERTER_URL"),
            converter_timeout_secs: parse_or(
                lookup,
                "CONVERTER_TIMEOUT_SECS",
                CONVERTER_TIMEOUT_SECS,
            ),
        };

        let identity = IdentityConfig {
            firebase_api_key: non_empty(lookup, "FIREBASE_API_KEY"),
            identity_base_url: non_empty(lookup, "IDENTITY_BASE_URL")
                .unwrap_or_else(|| IDENTITY_BASE_URL.to_string()),
        };

        Ok(AppConfig {
            server,
            storage,
            ingest,
            identity,
        })
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage.backend == StorageBackend::S3 && self.storage.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using S3 storage backend"
            ));
        }

        if self.ingest.converter_backend == ConverterBackend::Http
            && self.ingest.converter_url.is_none()
        {
            return Err(anyhow::anyhow!(
                "CONVERTER_URL must be set when CONVERTER_BACKEND=http"
            ));
        }

        if self.identity.firebase_api_key.is_none() {
            return Err(anyhow::anyhow!("FIREBASE_API_KEY must be set"));
        }

        if self.ingest.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.ingest.max_batch_size_bytes < self.ingest.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_BATCH_SIZE_MB must be at least MAX_FILE_SIZE_MB"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("FIREBASE_API_KEY", "key")]).unwrap();
        assert_eq!(config.server_port(), 8000);
        assert_eq!(config.storage_backend(), StorageBackend::Local);
        assert_eq!(config.ingest().max_file_size_bytes, 20 * 1024 * 1024);
        assert_eq!(config.ingest().concurrency, 1);
        assert_eq!(config.ingest().allowed_extensions.len(), 12);
        assert_eq!(config.ingest().converter_backend, ConverterBackend::Builtin);
        assert_eq!(config.server().login_rate_limit_per_minute, 10);
        assert_eq!(config.server().register_rate_limit_per_minute, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let result = config_from(&[("ENVIRONMENT", "production")]);
        assert!(result.is_err());

        let config = config_from(&[
            ("ENVIRONMENT", "prod"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.cors_origins().len(), 2);
    }

    #[test]
    fn test_allowed_extensions_are_normalized() {
        let config = config_from(&[("ALLOWED_EXTENSIONS", ".PDF, txt")]).unwrap();
        assert_eq!(config.ingest().allowed_extensions, vec!["pdf", "txt"]);
    }

    #[test]
    fn test_validate_requires_bucket_for_s3() {
        let config = config_from(&[("STORAGE_BACKEND", "s3"), ("FIREBASE_API_KEY", "key")])
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_url_for_http_converter() {
        let config = config_from(&[
            ("CONVERTER_BACKEND", "http"),
            ("FIREBASE_API_KEY", "key"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_backend_is_an_error() {
        assert!(config_from(&[("STORAGE_BACKEND", "gcs")]).is_err());
        assert!(config_from(&[("CONVERTER_BACKEND", "ocr")]).is_err());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let config = config_from(&[("INGEST_CONCURRENCY", "0")]).unwrap();
        assert_eq!(config.ingest().concurrency, 1);
    }
}
