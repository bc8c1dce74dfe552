//! Domain models shared between the pipeline and the HTTP surface.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::PROCESSED_SUFFIX;
use crate::error::AppError;

/// Storage tier of an artifact.
///
/// Every user owns two tiers: the bytes exactly as uploaded, and the plain-text
/// conversions derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Tier {
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "procesado")]
    Processed,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Original, Tier::Processed];

    /// Category name used on the wire (`original` / `procesado`).
    pub fn category(&self) -> &'static str {
        match self {
            Tier::Original => "original",
            Tier::Processed => "procesado",
        }
    }

    /// Folder under the user's prefix where this tier's objects live.
    pub fn folder(&self) -> &'static str {
        match self {
            Tier::Original => "uploads",
            Tier::Processed => "processed",
        }
    }
}

impl FromStr for Tier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Tier::Original),
            "procesado" => Ok(Tier::Processed),
            other => Err(AppError::BadRequest(format!(
                "Unknown category '{}': expected 'original' or 'procesado'",
                other
            ))),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.category())
    }
}

/// Name of the processed artifact derived from an original filename: `{stem}_procesado.txt`.
pub fn processed_name(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original);
    format!("{}{}", stem, PROCESSED_SUFFIX)
}

/// Lowercased extension of a filename without the leading dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Human-readable type label shown by the frontend for an original artifact.
pub fn file_type_label(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("pdf") => "PDF",
        Some("jpg") | Some("jpeg") | Some("png") => "Imagen",
        Some("doc") | Some("docx") => "Word",
        Some("xls") | Some("xlsx") => "Excel",
        Some("txt") => "Texto",
        Some("csv") => "CSV",
        Some("json") => "JSON",
        Some("xml") => "XML",
        _ => "Archivo",
    }
}

/// Label used for every artifact in the processed tier.
pub const PROCESSED_TYPE_LABEL: &str = "TXT Procesado";

/// Category of a per-file failure inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    Validation,
    Staging,
    Conversion,
    Storage,
    Internal,
}

/// One failed file in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileError {
    pub kind: FileErrorKind,
    pub filename: String,
    pub message: String,
}

impl FileError {
    pub fn new(kind: FileErrorKind, filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            message: message.into(),
        }
    }
}

impl Display for FileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.filename, self.message)
    }
}

/// Aggregate outcome of one ingestion request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessingResult {
    pub success: bool,
    pub files_uploaded: usize,
    pub files_processed: usize,
    pub message: String,
    /// `"{filename}: {message}"` entries, in submission order.
    pub errors: Vec<String>,
    /// Same failures as `errors`, with their kind.
    pub error_details: Vec<FileError>,
}

impl ProcessingResult {
    pub fn finalize(files_uploaded: usize, files_processed: usize, errors: Vec<FileError>) -> Self {
        let mut message = format!("Files uploaded: {}", files_uploaded);
        if files_processed > 0 {
            message.push_str(&format!(", processed: {}", files_processed));
        }
        Self {
            success: files_uploaded > 0,
            files_uploaded,
            files_processed,
            message,
            errors: errors.iter().map(ToString::to_string).collect(),
            error_details: errors,
        }
    }
}

/// Listing entry returned by `GET /api/files/list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    /// Size in MiB rounded to two decimals, suffixed with ` MB`.
    pub size: String,
    pub category: Tier,
    /// Last modification as `YYYY-MM-DD HH:MM`.
    pub date: String,
}

/// Formats a byte count as MiB rounded to two decimals.
pub fn size_mb(size_bytes: u64) -> f64 {
    (size_bytes as f64 / crate::constants::BYTES_PER_MIB as f64 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_name_uses_stem() {
        assert_eq!(processed_name("informe.pdf"), "informe_procesado.txt");
        assert_eq!(processed_name("a.b.docx"), "a.b_procesado.txt");
        assert_eq!(processed_name("notes"), "notes_procesado.txt");
    }

    #[test]
    fn test_tier_category_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(tier.category().parse::<Tier>().unwrap(), tier);
        }
        assert!("processed".parse::<Tier>().is_err());
        assert_eq!(Tier::Processed.folder(), "processed");
        assert_eq!(Tier::Original.folder(), "uploads");
    }

    #[test]
    fn test_tier_serializes_as_category() {
        assert_eq!(
            serde_json::to_string(&Tier::Processed).unwrap(),
            "\"procesado\""
        );
    }

    #[test]
    fn test_file_type_label() {
        assert_eq!(file_type_label("a.PDF"), "PDF");
        assert_eq!(file_type_label("photo.jpeg"), "Imagen");
        assert_eq!(file_type_label("sheet.xls"), "Excel");
        assert_eq!(file_type_label("data.bin"), "Archivo");
        assert_eq!(file_type_label("README"), "Archivo");
    }

    #[test]
    fn test_finalize_message_and_success() {
        let errors = vec![FileError::new(
            FileErrorKind::Validation,
            "virus.exe",
            "File type not allowed",
        )];
        let result = ProcessingResult::finalize(1, 1, errors);
        assert!(result.success);
        assert_eq!(result.message, "Files uploaded: 1, processed: 1");
        assert_eq!(result.errors, vec!["virus.exe: File type not allowed"]);

        let empty = ProcessingResult::finalize(0, 0, Vec::new());
        assert!(!empty.success);
        assert_eq!(empty.message, "Files uploaded: 0");
    }

    #[test]
    fn test_size_mb_rounds_to_two_decimals() {
        assert_eq!(size_mb(0), 0.0);
        assert_eq!(size_mb(1024 * 1024), 1.0);
        assert_eq!(size_mb(1024), 0.0);
        assert_eq!(size_mb(1536 * 1024), 1.5);
    }
}
