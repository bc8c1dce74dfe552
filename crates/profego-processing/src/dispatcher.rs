//! Conversion dispatch: probe, then convert, folding every result into a
//! [`ConversionOutcome`] the orchestrator can act on without matching errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::converter::Converter;
use crate::staging::StagedFile;

/// Converter output file, removed when dropped.
#[derive(Debug)]
pub struct ConvertedText {
    path: PathBuf,
}

impl ConvertedText {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for ConvertedText {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove converter output"
                );
            }
        }
    }
}

#[derive(Debug)]
pub enum ConversionOutcome {
    /// The converter does not handle this file; not an error.
    Unsupported,
    Converted(ConvertedText),
    Failed(String),
}

#[derive(Clone)]
pub struct ConversionDispatcher {
    converter: Arc<dyn Converter>,
}

impl ConversionDispatcher {
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self { converter }
    }

    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    /// Whether the converter supports the staged file. Probe errors count as unsupported.
    pub async fn probe(&self, staged: &StagedFile) -> bool {
        match self.converter.probe(staged.path()).await {
            Ok(supported) => supported,
            Err(e) => {
                tracing::warn!(
                    converter = self.converter.name(),
                    path = %staged.path().display(),
                    error = %e,
                    "Conversion probe failed"
                );
                false
            }
        }
    }

    pub async fn convert(&self, staged: &StagedFile) -> ConversionOutcome {
        if !self.probe(staged).await {
            return ConversionOutcome::Unsupported;
        }

        match self.converter.convert(staged.path()).await {
            Ok(path) => ConversionOutcome::Converted(ConvertedText::new(path)),
            Err(e) => ConversionOutcome::Failed(e.to_string()),
        }
    }
}
