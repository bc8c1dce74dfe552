use crate::constants::{RATE_LIMIT_WINDOW_SECS, TRUSTED_PROXY_COUNT};
use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use profego_core::AppError;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SHARD_COUNT: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

/// Fixed-window counter for one client.
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded in-memory rate limiter for one route group.
///
/// Keys are hashed onto shards so concurrent clients rarely contend on the same mutex.
pub struct HttpRateLimiter {
    scope: &'static str,
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
    limit_per_minute: u32,
    window: Duration,
}

impl HttpRateLimiter {
    pub fn new(scope: &'static str, limit_per_minute: u32) -> Self {
        Self::with_window(scope, limit_per_minute, Duration::from_secs(RATE_LIMIT_WINDOW_SECS))
    }

    pub fn with_window(scope: &'static str, limit_per_minute: u32, window: Duration) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            scope,
            shards,
            limit_per_minute,
            window,
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn limit(&self) -> u32 {
        self.limit_per_minute
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, RateLimitBucket>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Drop buckets whose window ended more than one window ago.
    pub async fn cleanup_expired_buckets(&self) {
        let now = Instant::now();
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| {
                bucket.reset_at > now || now.duration_since(bucket.reset_at) < self.window
            });
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                scope = self.scope,
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
    }

    /// Count one request for `key`. `Err` carries the time until the window resets.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let mut buckets = self.shard(key).lock().await;

        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);
            if buckets.len() >= MAX_BUCKETS_PER_SHARD {
                let oldest = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    buckets.remove(&oldest);
                }
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit_per_minute, self.window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }
}

/// Per-client-IP rate limiting middleware.
///
/// Adds `X-RateLimit-Limit` / `X-RateLimit-Remaining` to responses and answers
/// `429 Too Many Requests` with `Retry-After` once the window is used up.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(request.headers(), socket_addr.as_ref(), TRUSTED_PROXY_COUNT);
    let limit = rate_limiter.limit();

    match rate_limiter.check_rate_limit(&ip).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        Err(reset_in) => {
            tracing::warn!(
                scope = rate_limiter.scope(),
                client_ip = %ip,
                path = %request.uri().path(),
                limit = limit,
                "Rate limit exceeded"
            );

            let reset_seconds = reset_in.as_secs().max(1);
            let mut response = HttpAppError(AppError::TooManyRequests(
                "Too many requests. Please slow down.".to_string(),
            ))
            .into_response();
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
            headers.insert(RETRY_AFTER, HeaderValue::from(reset_seconds));
            response
        }
    }
}
