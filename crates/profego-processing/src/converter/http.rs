//! Converter backed by a remote conversion/OCR service.
//!
//! Protocol:
//! - `POST {base}/probe` with `{"filename": ...}` answers `{"supported": bool}`.
//! - `POST {base}/convert?filename=...` with the raw file as body answers
//!   `{"success": bool, "text": ..., "error": ...}`.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{write_output, ConversionError, Converter};

#[derive(Debug, Serialize)]
struct ProbeRequest<'a> {
    filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    supported: bool,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    success: bool,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpConverter {
    http_client: Client,
    base_url: String,
    output_dir: PathBuf,
}

impl Debug for HttpConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("HttpConverter")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpConverter {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        output_dir: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for converter service")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            output_dir: output_dir.into(),
        })
    }

    fn file_name(path: &Path) -> Result<&str, ConversionError> {
        path.file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConversionError::Unsupported(path.display().to_string()))
    }

    async fn error_from(response: reqwest::Response) -> ConversionError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ConversionError::Remote { status, message }
    }
}

#[async_trait]
impl Converter for HttpConverter {
    async fn probe(&self, path: &Path) -> Result<bool, ConversionError> {
        let filename = Self::file_name(path)?;

        let response = self
            .http_client
            .post(format!("{}/probe", self.base_url))
            .json(&ProbeRequest { filename })
            .send()
            .await
            .map_err(|e| ConversionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let probe: ProbeResponse = response
            .json()
            .await
            .map_err(|e| ConversionError::Transport(format!("invalid probe response: {}", e)))?;

        Ok(probe.supported)
    }

    async fn convert(&self, path: &Path) -> Result<PathBuf, ConversionError> {
        let filename = Self::file_name(path)?;
        let data = tokio::fs::read(path).await?;
        let size_bytes = data.len();
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/convert", self.base_url))
            .query(&[("filename", filename)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| ConversionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let converted: ConvertResponse = response.json().await.map_err(|e| {
            ConversionError::Transport(format!("invalid convert response: {}", e))
        })?;

        tracing::info!(
            filename = %filename,
            size_bytes = size_bytes,
            success = converted.success,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote conversion finished"
        );

        if !converted.success {
            return Err(ConversionError::Extraction(
                converted
                    .error
                    .unwrap_or_else(|| "converter reported failure".to_string()),
            ));
        }

        let text = converted.text.ok_or(ConversionError::EmptyOutput)?;
        let output_dir = self.output_dir.clone();
        let source = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_output(&output_dir, &source, &text))
            .await
            .map_err(|e| ConversionError::Extraction(format!("output task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
