//! Middlewares for routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::ServerError;
use crate::error::Result;
use crate::limits::RateLimiter;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers added to every response unless already set.
const SECURITY_HEADERS: [(&str, &str); 11] = [
    ("content-security-policy", "default-src 'self'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Reject clients exceeding their request window.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok());
    let client = limiter.client_ip(peer, forwarded);

    if !limiter.check(client) {
        tracing::warn!(%client, limit = limiter.limit(), "rate limit exceeded");
        return Err(ServerError::RateLimited);
    }

    Ok(next.run(req).await)
}

/// Set hardening headers on responses.
pub async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }

    response
}
