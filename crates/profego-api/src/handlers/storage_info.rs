use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use profego_storage::UserUsage;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/user/storage-info",
    tag = "user",
    responses(
        (status = 200, description = "File counts and sizes per tier", body = UserUsage),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn storage_info(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<UserUsage>, HttpAppError> {
    let usage = state.artifacts.usage(&user.email).await?;
    Ok(Json(usage))
}
