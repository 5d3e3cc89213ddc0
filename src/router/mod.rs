pub mod status;
pub mod users;
pub mod validation;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ResponseError, ServerError};
use validation::Rules;

/// JSON body checked against its [`Rules`].
///
/// Yields the rules output, never the raw body.
pub struct Valid<T: Rules>(pub T::Output);

impl<S, T> FromRequest<S> for Valid<T>
where
    T: Rules + DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        Ok(Valid(body.check()?))
    }
}

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    /// Envelope carrying `data`.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            message: None,
        }
    }

    /// Add `count` field.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl Envelope<()> {
    /// Envelope with only a message.
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            message: Some(message.to_owned()),
        }
    }
}

/// Answer unknown routes.
pub async fn fallback(uri: Uri) -> impl IntoResponse {
    ResponseError::default()
        .status(StatusCode::NOT_FOUND)
        .message(&format!("Route {} not found", uri.path()))
        .into_response()
        .map_err(|err| ServerError::Internal {
            details: err.to_string(),
        })
}

/// State backed by an in-memory repository.
#[cfg(test)]
pub fn state() -> crate::AppState {
    use std::sync::Arc;

    use crate::clock::SystemClock;
    use crate::config::{Configuration, TEST_ENVIRONMENT};
    use crate::user::UserService;
    use crate::user::memory::MemoryUserRepository;

    let mut config = Configuration::default();
    config.environment = TEST_ENVIRONMENT.to_owned();
    let users = UserService::new(
        Arc::new(MemoryUserRepository::new()),
        Arc::new(SystemClock),
    );

    crate::AppState::new(Arc::new(config), users)
}

/// Create `john@example.com` straight through the service.
#[cfg(test)]
pub async fn create_john(state: &crate::AppState) -> crate::user::UserResponse {
    let user = state
        .users
        .create_user(crate::user::NewUser {
            name: "John Doe".into(),
            email: "john@example.com".into(),
            password: "password123".into(),
        })
        .await
        .unwrap();
    user.into()
}
