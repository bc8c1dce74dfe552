use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use profego_core::AppError;

use super::models::UserContext;
use super::provider::AuthError;
use crate::error::HttpAppError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".to_string())
        })?;

    Ok(token)
}

/// Resolve the bearer token through the identity provider and attach a [`UserContext`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => return HttpAppError(e).into_response(),
    };

    match state.identity.verify(&token).await {
        Ok(identity) => {
            tracing::debug!(user = %identity.email, "Request authenticated");
            request.extensions_mut().insert(UserContext {
                email: identity.email,
            });
            next.run(request).await
        }
        Err(AuthError::Unavailable(reason)) => {
            HttpAppError::from(AuthError::Unavailable(reason)).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            HttpAppError(AppError::Unauthorized(
                "Invalid or expired token".to_string(),
            ))
            .into_response()
        }
    }
}
