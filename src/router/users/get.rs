//! Get a user by identifier.

use axum::Json;
use axum::extract::{Path, State};

use crate::error::{Result, ServerError};
use crate::router::Envelope;
use crate::user::{UserResponse, UserService};

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<UserResponse>>> {
    let user = users
        .get_user_by_id(&id)
        .await?
        .ok_or(ServerError::NotFound)?;

    Ok(Json(Envelope::data(user.into())))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;

    use crate::*;

    #[tokio::test]
    async fn test_get_handler() {
        let state = router::state();
        let user = router::create_john(&state).await;

        let path = format!("/api/v1/users/{}", user.id);
        let response =
            make_request(app(state), Method::GET, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["data"]["_id"], user.id);
        assert_eq!(body["data"]["name"], "John Doe");
        assert_eq!(body["data"]["email"], "john@example.com");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_get_handler_not_found() {
        for path in [
            "/api/v1/users/507f1f77bcf86cd799439011",
            "/api/v1/users/not-an-id",
        ] {
            let response = make_request(
                app(router::state()),
                Method::GET,
                path,
                String::default(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["message"], "User not found");
        }
    }
}
