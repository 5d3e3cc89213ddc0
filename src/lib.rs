//! Userbase is a minimal REST API managing user records on MongoDB.

#![forbid(unsafe_code)]
#![deny(unused_mut)]
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod limits;
mod middleware;
mod router;
pub mod telemetry;
pub mod user;

use std::future::ready;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::clock::SystemClock;
use crate::config::Configuration;
use crate::database::Database;
use crate::limits::RateLimiter;
use crate::user::{MongoUserRepository, UserService};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub users: UserService,
    pub limiter: Arc<RateLimiter>,
    pub started_at: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new [`AppState`] with a limiter sized from `config`.
    pub fn new(config: Arc<Configuration>, users: UserService) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        )
        .trust(config.rate_limit.trusted_proxies.iter().copied());

        Self {
            config,
            users,
            limiter: Arc::new(limiter),
            started_at: Instant::now(),
            metrics: None,
        }
    }

    /// Expose `/metrics` using `handle`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> UserService {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Arc<RateLimiter> {
        Arc::clone(&state.limiter)
    }
}

impl FromRef<AppState> for Instant {
    fn from_ref(state: &AppState) -> Instant {
        state.started_at
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let middleware = ServiceBuilder::new()
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.timeout_secs),
        ))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any),
        )
        .layer(AxumMiddleware::map_response(middleware::security_headers))
        .layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        // Reject large bodies. Must stay innermost as it changes the body type.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit));

    let mut routes = Router::new()
        // `GET /health` goes to `health`.
        .route("/health", get(router::status::health))
        .nest("/api/v1/users", router::users::router());

    if let Some(handle) = state.metrics.clone() {
        // `GET /metrics` renders Prometheus text.
        routes = routes.route("/metrics", get(move || ready(handle.render())));
    }

    let routes = routes
        .fallback(router::fallback)
        .with_state(state)
        .layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware);

    if config.is_test() {
        return routes;
    }

    // Add high level tracing/logging to all requests.
    routes.layer(
        TraceLayer::new_for_http()
            .on_body_chunk(
                |chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                },
            )
            .make_span_with(
                DefaultMakeSpan::new()
                    .include_headers(true)
                    .level(tracing::Level::INFO),
            )
            .on_request(DefaultOnRequest::new())
            .on_response(
                DefaultOnResponse::new()
                    .include_headers(true)
                    .latency_unit(LatencyUnit::Micros),
            ),
    )
}

/// Initialize the application state and its database handle.
pub async fn initialize_state(
    config: Arc<Configuration>,
) -> Result<(AppState, Database), Box<dyn std::error::Error>> {
    let db = match &config.mongodb {
        Some(mongo) if !mongo.uri.is_empty() => {
            Database::connect(mongo, &config.environment).await?
        },
        _ => {
            tracing::error!("missing `mongodb.uri` entry on `config.yaml` file");
            std::process::exit(1);
        },
    };

    // unique email index is required before serving writes.
    db.ensure_indexes().await?;

    let users = UserService::new(
        Arc::new(MongoUserRepository::new(db.users())),
        Arc::new(SystemClock),
    );

    Ok((AppState::new(config, users), db))
}
