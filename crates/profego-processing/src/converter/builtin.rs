//! In-process text extraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use profego_core::extension_of;

use super::{decode_text, write_output, ConversionError, Converter};

/// Extensions decoded as text without any parsing.
const PLAIN_TEXT: &[&str] = &["txt", "csv", "json", "xml"];

/// Extracts text from PDFs, OOXML documents, spreadsheets and plain text formats.
///
/// Legacy `.doc` files and images are not supported; those need an external
/// converter with OCR.
#[derive(Debug, Clone)]
pub struct BuiltinConverter {
    output_dir: PathBuf,
}

impl BuiltinConverter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn supports_extension(extension: &str) -> bool {
        match extension {
            ext if PLAIN_TEXT.contains(&ext) => true,
            #[cfg(feature = "pdf")]
            "pdf" => true,
            #[cfg(feature = "office")]
            "docx" | "xlsx" | "xls" => true,
            _ => false,
        }
    }
}

#[async_trait]
impl Converter for BuiltinConverter {
    async fn probe(&self, path: &Path) -> Result<bool, ConversionError> {
        let supported = path
            .to_str()
            .and_then(extension_of)
            .is_some_and(|ext| Self::supports_extension(&ext));
        Ok(supported)
    }

    async fn convert(&self, path: &Path) -> Result<PathBuf, ConversionError> {
        let extension = path
            .to_str()
            .and_then(extension_of)
            .ok_or_else(|| ConversionError::Unsupported(path.display().to_string()))?;
        let source = path.to_path_buf();
        let output_dir = self.output_dir.clone();

        tokio::task::spawn_blocking(move || {
            let text = extract_text(&source, &extension)?;
            tracing::debug!(
                source = %source.display(),
                extension = %extension,
                text_len = text.len(),
                "Text extracted"
            );
            write_output(&output_dir, &source, &text)
        })
        .await
        .map_err(|e| ConversionError::Extraction(format!("extraction task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

fn extract_text(path: &Path, extension: &str) -> Result<String, ConversionError> {
    match extension {
        ext if PLAIN_TEXT.contains(&ext) => Ok(decode_text(&std::fs::read(path)?)),
        #[cfg(feature = "pdf")]
        "pdf" => non_empty(extract_pdf(path)?),
        #[cfg(feature = "office")]
        "docx" => non_empty(extract_docx(path)?),
        #[cfg(feature = "office")]
        "xlsx" | "xls" => non_empty(extract_spreadsheet(path)?),
        other => Err(ConversionError::Unsupported(format!(".{}", other))),
    }
}

#[allow(dead_code)]
fn non_empty(text: String) -> Result<String, ConversionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::EmptyOutput);
    }
    Ok(trimmed.to_string())
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<String, ConversionError> {
    pdf_extract::extract_text(path).map_err(|e| ConversionError::Extraction(e.to_string()))
}

#[cfg(feature = "office")]
fn extract_docx(path: &Path) -> Result<String, ConversionError> {
    let data = std::fs::read(path)?;
    let doc =
        docx_rs::read_docx(&data).map_err(|e| ConversionError::Extraction(e.to_string()))?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content)
}

#[cfg(feature = "office")]
fn extract_spreadsheet(path: &Path) -> Result<String, ConversionError> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| ConversionError::Extraction(e.to_string()))?;

    let mut content = String::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %sheet_name, error = %e, "Skipping unreadable sheet");
                continue;
            }
        };

        content.push_str(&format!("Sheet: {}\n", sheet_name));
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    calamine::Data::Empty => String::new(),
                    calamine::Data::String(s) => s.clone(),
                    calamine::Data::Float(f) => f.to_string(),
                    calamine::Data::Int(i) => i.to_string(),
                    calamine::Data::Bool(b) => b.to_string(),
                    calamine::Data::DateTime(dt) => dt.to_string(),
                    _ => String::new(),
                })
                .collect();

            if !cells.iter().all(|s| s.is_empty()) {
                content.push_str(&cells.join("\t"));
                content.push('\n');
            }
        }
        content.push('\n');
    }

    Ok(content)
}
