//! Liveness endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Configuration;

/// Server status.
#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started serving.
    pub uptime: f64,
    pub environment: String,
}

/// `GET /health`.
pub async fn health(
    State(config): State<Arc<Configuration>>,
    State(started_at): State<Instant>,
) -> Json<Health> {
    Json(Health {
        status: "OK".to_owned(),
        timestamp: Utc::now(),
        uptime: started_at.elapsed().as_secs_f64(),
        environment: config.environment.clone(),
    })
}
