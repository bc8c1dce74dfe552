use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use profego_core::{extension_of, AppError, Tier};
use profego_processing::converter::decode_text;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Characters left unescaped in an RFC 5987 `filename*` value.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Extensions rendered inline by the preview endpoint.
const INLINE_PREVIEW: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif", "bmp"];

const OCTET_STREAM: &str = "application/octet-stream";

pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("pdf") => "application/pdf",
        // Originals may be Latin-1; no charset is claimed for the stored bytes.
        Some("txt") => "text/plain",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => OCTET_STREAM,
    }
}

/// `Content-Disposition` value with an ASCII fallback name and the exact UTF-8 name.
pub fn content_disposition(disposition: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition,
        fallback,
        utf8_percent_encode(filename, FILENAME_ENCODE_SET)
    )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TextPreview {
    #[serde(rename = "type")]
    pub preview_type: String,
    pub content: String,
    pub filename: String,
}

async fn fetch(
    state: &AppState,
    user: &UserContext,
    category: &str,
    filename: &str,
) -> Result<Bytes, HttpAppError> {
    let tier: Tier = category.parse()?;
    let data = state
        .artifacts
        .get(&user.email, filename, tier)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
    Ok(data)
}

fn binary_response(
    data: Bytes,
    filename: &str,
    disposition: &str,
) -> Result<Response<Body>, HttpAppError> {
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, filename),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/files/download/{category}/{filename}",
    tag = "files",
    params(
        ("category" = String, Path, description = "`original` or `procesado`"),
        ("filename" = String, Path, description = "Logical file name")
    ),
    responses(
        (status = 200, description = "File bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Unknown category", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user = %user.email, category = %category, filename = %filename, operation = "download_file")
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path((category, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let data = fetch(&state, &user, &category, &filename).await?;
    tracing::debug!(size_bytes = data.len(), "Serving download");
    binary_response(data, &filename, "attachment")
}

#[utoipa::path(
    get,
    path = "/api/files/preview/{category}/{filename}",
    tag = "files",
    params(
        ("category" = String, Path, description = "`original` or `procesado`"),
        ("filename" = String, Path, description = "Logical file name")
    ),
    responses(
        (status = 200, description = "Inline bytes for pdf and images, JSON for text", body = TextPreview),
        (status = 400, description = "Unknown category or no preview for this type", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user = %user.email, category = %category, filename = %filename, operation = "preview_file")
)]
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path((category, filename)): Path<(String, String)>,
) -> Result<Response<Body>, HttpAppError> {
    let extension = extension_of(&filename).unwrap_or_default();
    let inline = INLINE_PREVIEW.contains(&extension.as_str());
    if !inline && extension != "txt" {
        // Still validate the category so a bad one reports as such.
        category.parse::<Tier>()?;
        return Err(AppError::BadRequest(format!(
            "Preview not available for .{} files",
            extension
        ))
        .into());
    }

    let data = fetch(&state, &user, &category, &filename).await?;

    if inline {
        return binary_response(data, &filename, "inline");
    }

    Ok(Json(TextPreview {
        preview_type: "text".to_string(),
        content: decode_text(&data),
        filename,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("notas.TXT"), "text/plain");
        assert_eq!(content_type_for("a.csv"), OCTET_STREAM);
        assert_eq!(content_type_for("noext"), OCTET_STREAM);
    }

    #[test]
    fn test_content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("attachment", "notes.txt"),
            "attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt"
        );
        assert_eq!(
            content_disposition("inline", "mi \"plan\" año.pdf"),
            "inline; filename=\"mi _plan_ a_o.pdf\"; filename*=UTF-8''mi%20%22plan%22%20a%C3%B1o.pdf"
        );
    }
}
