//! Error handler for userbase.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

pub const VALIDATION_FAILED: &str = "Validation failed";
pub const USER_NOT_FOUND: &str = "User not found";
const INVALID_BODY: &str = "Invalid request body";
const BODY_TOO_LARGE: &str = "Request body too large";
const TOO_MANY_REQUESTS: &str =
    "Too many requests from this IP, please try again later.";
const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationFailure),

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("database request failed: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// A single violated field constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every violated constraint of a payload, in rule order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationFailure {
    errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure carrying exactly one field error.
    pub fn single(field: &str, message: &str) -> Self {
        let mut failure = Self::new();
        failure.add(field, message);
        failure
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_owned(),
            message: message.to_owned(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` has at least one error.
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when nothing was collected.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Body of a failed response, nested under `error`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Structure for failed response envelopes.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    #[serde(skip)]
    status: u16,
    success: bool,
    error: ErrorBody,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `error.message` field.
    pub fn message(mut self, message: &str) -> Self {
        self.error.message = message.into();
        self
    }

    /// Attach `error.details`.
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Automatically add per-field details.
    pub fn errors(self, failure: &ValidationFailure) -> Self {
        let details = serde_json::to_value(failure.errors()).unwrap_or_default();
        self.details(details)
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            success: false,
            error: ErrorBody {
                message: INTERNAL_SERVER_ERROR.to_owned(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = match &self {
            ServerError::Validation(failure) => ResponseError::default()
                .status(StatusCode::BAD_REQUEST)
                .message(VALIDATION_FAILED)
                .errors(failure),

            ServerError::NotFound => ResponseError::default()
                .status(StatusCode::NOT_FOUND)
                .message(USER_NOT_FOUND),

            ServerError::Json(rejection) => {
                let status = rejection.status();
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    BODY_TOO_LARGE
                } else {
                    INVALID_BODY
                };

                ResponseError::default()
                    .status(status)
                    .message(message)
                    .details(serde_json::Value::String(rejection.body_text()))
            },

            ServerError::RateLimited => ResponseError::default()
                .status(StatusCode::TOO_MANY_REQUESTS)
                .message(TOO_MANY_REQUESTS),

            ServerError::Database(err) => {
                tracing::error!(error = %err, "database returned an unexpected error");
                ResponseError::default()
            },

            ServerError::Internal { details } => {
                tracing::error!(%details, "server returned 500 status");
                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "success": false,
                "error": { "message": INTERNAL_SERVER_ERROR },
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new(INTERNAL_SERVER_ERROR.into()))
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_failure_collects_in_order() {
        let mut failure = ValidationFailure::new();
        assert!(failure.is_empty());
        failure.add("name", "first");
        failure.add("email", "second");

        assert!(failure.has("email"));
        assert!(!failure.has("password"));
        assert_eq!(failure.errors()[0].field, "name");
        assert_eq!(failure.errors()[1].message, "second");
        assert!(failure.into_result(()).is_err());
    }

    #[tokio::test]
    async fn test_validation_response() {
        let (status, body) =
            body_of(ValidationFailure::single("email", "bad").into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["message"], VALIDATION_FAILED);
        assert_eq!(body["error"]["details"][0]["field"], "email");
        assert_eq!(body["error"]["details"][0]["message"], "bad");
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let (status, body) = body_of(ServerError::NotFound).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], USER_NOT_FOUND);
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_does_not_leak() {
        let (status, body) = body_of(ServerError::Internal {
            details: "connection reset by peer".into(),
        })
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("connection reset"));
    }
}
