//! Health check handler.

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StorageHealth {
    pub backend: String,
    /// `connected` or `disconnected`.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when storage answers, `degraded` otherwise.
    pub status: String,
    pub timestamp: String,
    pub storage: StorageHealth,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);
    let connected = match tokio::time::timeout(timeout, state.artifacts.health_check()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage: StorageHealth {
            backend: state.artifacts.backend_type().to_string(),
            status: if connected { "connected" } else { "disconnected" }.to_string(),
        },
    })
}
