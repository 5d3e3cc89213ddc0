//! List active users.

use axum::Json;
use axum::extract::State;

use crate::error::Result;
use crate::router::Envelope;
use crate::user::{UserResponse, UserService};

pub async fn handler(
    State(users): State<UserService>,
) -> Result<Json<Envelope<Vec<UserResponse>>>> {
    let users: Vec<UserResponse> = users
        .get_all_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    let count = users.len();

    Ok(Json(Envelope::data(users).count(count)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use crate::*;

    #[tokio::test]
    async fn test_list_handler() {
        let state = router::state();
        for (name, email) in [("John Doe", "john@example.com"), ("Jane Doe", "jane@example.com")] {
            let body = json!({ "name": name, "email": email, "password": "password123" });
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/api/v1/users",
                body.to_string(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response =
            make_request(app(state), Method::GET, "/api/v1/users", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert!(body["data"][0].get("password").is_none());
    }

    #[tokio::test]
    async fn test_list_handler_empty() {
        let response = make_request(
            app(router::state()),
            Method::GET,
            "/api/v1/users",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["count"], 0);
        assert_eq!(body["data"], json!([]));
    }
}
