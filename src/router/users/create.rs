//! Create a user.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::config::Configuration;
use crate::error::{Result, ServerError};
use crate::router::validation::CreateUserBody;
use crate::router::{Envelope, Valid};
use crate::user::{UserResponse, UserService};

/// `Location` of a created user, absolute when a public URL is set.
fn location(config: &Configuration, id: &str) -> String {
    let path = format!("/api/v1/users/{id}");

    match url::Url::parse(&config.url).and_then(|url| url.join(&path)) {
        Ok(url) => url.to_string(),
        Err(_) => path,
    }
}

/// Handler to create user.
pub async fn handler(
    State(config): State<Arc<Configuration>>,
    State(users): State<UserService>,
    Valid(data): Valid<CreateUserBody>,
) -> Result<Response> {
    let user = UserResponse::from(users.create_user(data).await?);
    let location = HeaderValue::from_str(&location(&config, &user.id))
        .map_err(|err| ServerError::Internal {
            details: err.to_string(),
        })?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(Envelope::data(user)),
    )
        .into_response())
}
