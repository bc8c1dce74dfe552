//! Reading uploaded files out of a multipart body.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::BytesMut;
use profego_core::AppError;

use crate::constants::{MAX_FILENAME_BYTES, UPLOAD_FIELD};
use crate::services::SubmittedFile;

const UNNAMED_FILE: &str = "unnamed";

/// Limits applied while reading a batch.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Bytes kept per file; beyond this the file's bytes are discarded and only counted.
    pub max_file_size: u64,
    /// Total bytes across the request; beyond this the whole request is rejected.
    pub max_batch_size: u64,
}

/// Reduce a client-supplied filename to a bare logical name.
///
/// Keeps only the last path segment, drops control characters and caps the UTF-8
/// length at [`MAX_FILENAME_BYTES`]. Spaces and non-ASCII letters are preserved.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();

    match cleaned.trim() {
        "" | "." | ".." => UNNAMED_FILE.to_string(),
        name => truncate_name(name, MAX_FILENAME_BYTES),
    }
}

/// Cut `name` to at most `max_bytes`, shortening the stem so the extension survives.
fn truncate_name(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= max_bytes / 2 => name.split_at(dot),
        _ => (name, ""),
    };

    let mut end = (max_bytes - extension.len()).min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read multipart: {}", e.body_text()))
    }
}

/// Read every `files` field of the body in submission order.
///
/// Files over `max_file_size` are drained without buffering and returned as
/// [`SubmittedFile::discarded`] so the pipeline can report them.
pub async fn read_submitted_files(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<Vec<SubmittedFile>, AppError> {
    let mut files = Vec::new();
    let mut batch_total: u64 = 0;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or_default());
        let file = read_field(field, filename, limits, &mut batch_total).await?;
        files.push(file);
    }

    Ok(files)
}

async fn read_field(
    mut field: Field<'_>,
    filename: String,
    limits: UploadLimits,
    batch_total: &mut u64,
) -> Result<SubmittedFile, AppError> {
    let mut buffer = BytesMut::new();
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let len = chunk.len() as u64;
        size += len;
        *batch_total += len;
        if *batch_total > limits.max_batch_size {
            return Err(AppError::PayloadTooLarge(format!(
                "Upload exceeds the batch limit of {} bytes",
                limits.max_batch_size
            )));
        }
        if size <= limits.max_file_size {
            buffer.extend_from_slice(&chunk);
        } else if !buffer.is_empty() {
            buffer = BytesMut::new();
        }
    }

    if size > limits.max_file_size {
        tracing::debug!(filename = %filename, size_bytes = size, "Discarded oversized file");
        return Ok(SubmittedFile::discarded(filename, size));
    }

    Ok(SubmittedFile::new(filename, buffer.freeze()))
}
