//! Converters turn a staged file into a plain-text file.
//!
//! A converter answers two questions about a path: can it handle the file
//! (`probe`), and where is the text it produced (`convert`). The caller owns the
//! returned output path and is responsible for removing it.

mod builtin;
#[cfg(feature = "remote-converter")]
mod http;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use builtin::BuiltinConverter;
#[cfg(feature = "remote-converter")]
pub use http::HttpConverter;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("No text could be extracted")]
    EmptyOutput,

    #[error("Converter service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Converter service unreachable: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait Converter: Send + Sync {
    /// Whether this converter can produce text for the file at `path`.
    async fn probe(&self, path: &Path) -> Result<bool, ConversionError>;

    /// Convert the file at `path` and return the path of the produced text file.
    async fn convert(&self, path: &Path) -> Result<PathBuf, ConversionError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Write converter output next to the staged files and keep it on disk.
pub(crate) fn write_output(dir: &Path, source: &Path, text: &str) -> Result<PathBuf, ConversionError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", stem))
        .suffix(".txt")
        .tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    let path = file.into_temp_path().keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Decode text as UTF-8, falling back to Latin-1 byte-for-byte.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("año".as_bytes()), "año");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_text(&[0x61, 0xF1, 0x6F]), "año");
    }

    #[test]
    fn test_decode_strips_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhola"), "hola");
    }

    #[test]
    fn test_write_output_persists_until_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_output(dir.path(), Path::new("/x/informe.pdf"), "texto").unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("informe-"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "texto");
    }
}
