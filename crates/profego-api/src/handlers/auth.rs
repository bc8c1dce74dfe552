use crate::auth::models::{CredentialsRequest, LoginResponse, MessageResponse};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Invalid input, unknown user or bad credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>, HttpAppError> {
    let session = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;

    state.artifacts.init_user(&session.email).await?;

    tracing::info!(user = %session.email, provider = state.identity.name(), "User signed in");

    Ok(Json(LoginResponse {
        email: session.email,
        token: session.token,
        message: "Login successful".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CredentialsRequest>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    state
        .identity
        .sign_up(&request.email, &request.password)
        .await?;

    state.artifacts.init_user(&request.email).await?;

    tracing::info!(user = %request.email, provider = state.identity.name(), "User registered");

    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}
