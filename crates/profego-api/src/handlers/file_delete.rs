use crate::auth::models::MessageResponse;
use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use profego_core::Tier;
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/api/files/delete/{category}/{filename}",
    tag = "files",
    params(
        ("category" = String, Path, description = "`original` or `procesado`"),
        ("filename" = String, Path, description = "Logical file name")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Unknown category", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user = %user.email, category = %category, filename = %filename, operation = "delete_file")
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path((category, filename)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let tier: Tier = category.parse()?;
    state.artifacts.delete(&user.email, &filename, tier).await?;

    tracing::info!("File deleted");

    Ok(Json(MessageResponse {
        message: format!("File {} deleted", filename),
    }))
}
