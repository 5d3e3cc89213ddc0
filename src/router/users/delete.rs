//! Soft delete a user.

use axum::Json;
use axum::extract::{Path, State};

use crate::error::{Result, ServerError};
use crate::router::Envelope;
use crate::user::UserService;

pub const USER_DELETED: &str = "User deleted successfully";

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>> {
    users.delete_user(&id).await?.ok_or(ServerError::NotFound)?;

    Ok(Json(Envelope::message(USER_DELETED)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::USER_DELETED;
    use crate::*;

    #[tokio::test]
    async fn test_delete_handler() {
        let state = router::state();
        let user = router::create_john(&state).await;
        let path = format!("/api/v1/users/{}", user.id);

        let response =
            make_request(app(state.clone()), Method::DELETE, &path, String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], USER_DELETED);
        assert!(body.get("data").is_none());

        // still reachable by identifier, but inactive.
        let response =
            make_request(app(state.clone()), Method::GET, &path, String::default())
                .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["data"]["isActive"], false);

        // second call succeeds too.
        let response =
            make_request(app(state), Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_handler_not_found() {
        let response = make_request(
            app(router::state()),
            Method::DELETE,
            "/api/v1/users/507f1f77bcf86cd799439011",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["message"], "User not found");
    }
}
