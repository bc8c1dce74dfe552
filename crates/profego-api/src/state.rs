//! Application state shared by handlers and middleware.

use std::sync::Arc;

use profego_core::Config;
use profego_storage::ArtifactStore;

use crate::auth::IdentityProvider;
use crate::middleware::rate_limit::HttpRateLimiter;
use crate::services::IngestService;

/// Per-route rate limiters, keyed by client IP inside each limiter.
#[derive(Clone)]
pub struct RateLimiters {
    pub login: Arc<HttpRateLimiter>,
    pub register: Arc<HttpRateLimiter>,
    pub upload: Arc<HttpRateLimiter>,
    pub delete: Arc<HttpRateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Self {
        let server = config.server();
        Self {
            login: Arc::new(HttpRateLimiter::new("login", server.login_rate_limit_per_minute)),
            register: Arc::new(HttpRateLimiter::new(
                "register",
                server.register_rate_limit_per_minute,
            )),
            upload: Arc::new(HttpRateLimiter::new("upload", server.upload_rate_limit_per_minute)),
            delete: Arc::new(HttpRateLimiter::new("delete", server.delete_rate_limit_per_minute)),
        }
    }

    pub fn all(&self) -> [&Arc<HttpRateLimiter>; 4] {
        [&self.login, &self.register, &self.upload, &self.delete]
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub artifacts: ArtifactStore,
    pub ingest: Arc<IngestService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rate_limiters: RateLimiters,
}
