//! Route configuration and setup.

use crate::auth::middleware::auth_middleware;
use crate::constants::{MULTIPART_OVERHEAD_BYTES, RATE_LIMIT_CLEANUP_INTERVAL_SECS};
use crate::handlers;
use crate::middleware::rate_limit::{rate_limit_middleware, HttpRateLimiter};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, MethodRouter},
    Json, Router,
};
use profego_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    spawn_rate_limit_cleanup(&state);

    let limiters = &state.rate_limiters;
    let upload_body_limit =
        usize::try_from(config.ingest().max_batch_size_bytes + MULTIPART_OVERHEAD_BYTES)
            .unwrap_or(usize::MAX);

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/auth/login",
            rate_limited(post(handlers::auth::login), &limiters.login),
        )
        .route(
            "/api/auth/register",
            rate_limited(post(handlers::auth::register), &limiters.register),
        );

    // Multipart bodies are bounded by the batch ceiling instead of axum's 2 MB default.
    let upload_routes = Router::new()
        .route(
            "/api/files/upload",
            rate_limited(post(handlers::file_upload::upload_files), &limiters.upload),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_body_limit));

    let protected_routes = Router::new()
        .merge(upload_routes)
        .route("/api/files/list", get(handlers::file_list::list_files))
        .route(
            "/api/files/download/{category}/{filename}",
            get(handlers::file_access::download_file),
        )
        .route(
            "/api/files/preview/{category}/{filename}",
            get(handlers::file_access::preview_file),
        )
        .route(
            "/api/files/delete/{category}/{filename}",
            rate_limited(delete(handlers::file_delete::delete_file), &limiters.delete),
        )
        .route(
            "/api/user/storage-info",
            get(handlers::storage_info::storage_info),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut app = public_routes
        .merge(protected_routes)
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"));

    if let Some(frontend_dir) = config.frontend_dir() {
        tracing::info!(frontend_dir = %frontend_dir.display(), "Serving static frontend");
        app = app.fallback_service(ServeDir::new(frontend_dir).append_index_html_on_directories(true));
    }

    Ok(app.layer(cors).layer(TraceLayer::new_for_http()))
}

fn rate_limited(
    route: MethodRouter<Arc<AppState>>,
    limiter: &Arc<HttpRateLimiter>,
) -> MethodRouter<Arc<AppState>> {
    route.layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
}

fn spawn_rate_limit_cleanup(state: &Arc<AppState>) {
    let limiters = state.rate_limiters.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
            RATE_LIMIT_CLEANUP_INTERVAL_SECS,
        ));
        loop {
            interval.tick().await;
            for limiter in limiters.all() {
                limiter.cleanup_expired_buckets().await;
            }
        }
    });

    for limiter in state.rate_limiters.all() {
        tracing::info!(
            scope = limiter.scope(),
            limit_per_minute = limiter.limit(),
            "Rate limiting enabled"
        );
    }
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
