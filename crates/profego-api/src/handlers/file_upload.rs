use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::multipart::{read_submitted_files, UploadLimits};
use axum::{
    extract::{Multipart, State},
    Json,
};
use profego_core::ProcessingResult;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(content_type = "multipart/form-data", description = "One or more `files` parts"),
    responses(
        (status = 200, description = "Batch processed; per-file failures are listed in `errors`", body = ProcessingResult),
        (status = 400, description = "Malformed multipart body", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 413, description = "Batch exceeds the request size limit", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user = %user.email, operation = "upload_files"))]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    multipart: Multipart,
) -> Result<Json<ProcessingResult>, HttpAppError> {
    let ingest = state.config.ingest();
    let limits = UploadLimits {
        max_file_size: ingest.max_file_size_bytes,
        max_batch_size: ingest.max_batch_size_bytes,
    };

    let files = read_submitted_files(multipart, limits).await?;
    let result = state.ingest.ingest(&user.email, files).await;

    Ok(Json(result))
}
