//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that converts into
//! [`AppError`] can be lifted with `?` and renders with the status, body and log level its
//! [`ErrorMetadata`] prescribes.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use profego_core::{AppError, ErrorMetadata, LogLevel};
use profego_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Client-facing message.
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Wait 60s and retry")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            details: None,
            error_type: None,
            code: code.into(),
            recoverable: false,
            suggested_action: None,
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
///
/// Orphan rules keep `IntoResponse` off `AppError` itself, which lives in profego-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app_error = match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            StorageError::InvalidKey(msg) => AppError::BadRequest(msg),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app_error)
    }
}

impl From<AuthError> for HttpAppError {
    fn from(err: AuthError) -> Self {
        let app_error = match err {
            AuthError::UnknownIdentity => AppError::BadRequest("User not found".to_string()),
            AuthError::BadCredential => AppError::BadRequest("Invalid credentials".to_string()),
            AuthError::RateLimited => AppError::TooManyRequests(
                "Too many failed attempts, try again later".to_string(),
            ),
            AuthError::EmailExists => {
                AppError::BadRequest("The email is already registered".to_string())
            }
            AuthError::InvalidEmail => AppError::InvalidInput("Invalid email".to_string()),
            AuthError::WeakPassword(reason) => AppError::InvalidInput(reason),
            AuthError::InvalidToken => {
                AppError::Unauthorized("Invalid or expired token".to_string())
            }
            AuthError::Unavailable(reason) => AppError::IdentityUnavailable(reason),
        };
        HttpAppError(app_error)
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + validator::Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(AppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error.detailed_message(), error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details only leave the process outside production, and never for sensitive errors.
        let expose_details = !is_production_env() && !app_error.is_sensitive();
        let body = Json(ErrorResponse {
            detail: app_error.client_message(),
            details: expose_details.then(|| app_error.detailed_message()),
            error_type: expose_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let err = HttpAppError::from(StorageError::NotFound("users/a/uploads/x".to_string()));
        assert_eq!(err.0.http_status_code(), 404);
    }

    #[test]
    fn test_storage_failure_maps_to_500() {
        let err = HttpAppError::from(StorageError::BackendError("down".to_string()));
        assert_eq!(err.0.http_status_code(), 500);
    }

    #[test]
    fn test_auth_errors_classified() {
        assert_eq!(HttpAppError::from(AuthError::UnknownIdentity).0.http_status_code(), 400);
        assert_eq!(HttpAppError::from(AuthError::BadCredential).0.http_status_code(), 400);
        assert_eq!(HttpAppError::from(AuthError::EmailExists).0.http_status_code(), 400);
        assert_eq!(HttpAppError::from(AuthError::RateLimited).0.http_status_code(), 429);
        assert_eq!(HttpAppError::from(AuthError::InvalidToken).0.http_status_code(), 401);
        assert_eq!(
            HttpAppError::from(AuthError::Unavailable("timeout".to_string()))
                .0
                .http_status_code(),
            503
        );
    }
}
