//! Client IP extraction for rate limiting.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Client IP from `X-Forwarded-For`, `X-Real-IP`, or the socket address, in that order.
///
/// With `trusted_proxy_count` proxies in front of the server, the address added by the
/// outermost trusted proxy is used; anything further left could be spoofed.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| from_forwarded_for(value, trusted_proxy_count))
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| is_valid_ip(ip))
    {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    if trusted_proxy_count == 0 {
        return None;
    }

    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let index = ips.len().checked_sub(trusted_proxy_count)?;
    let candidate = ips.get(index)?;
    is_valid_ip(candidate).then(|| candidate.to_string())
}

fn is_valid_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}
