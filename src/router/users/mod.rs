//! Users-related HTTP API.
mod create;
mod delete;
mod get;
mod list;
mod update;

use axum::Router;
use axum::routing::get;

use crate::AppState;

/// Routes mounted under `/api/v1/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        // `GET /` lists active users, `POST /` creates one.
        .route("/", get(list::handler).post(create::handler))
        // `GET`, `PUT` and `DELETE` on `/{id}`.
        .route(
            "/{id}",
            get(get::handler)
                .put(update::handler)
                .delete(delete::handler),
        )
}
