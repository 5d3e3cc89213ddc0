//! Update a user.

use axum::Json;
use axum::extract::{Path, State};

use crate::error::{Result, ServerError};
use crate::router::validation::UpdateUserBody;
use crate::router::{Envelope, Valid};
use crate::user::{UserResponse, UserService};

pub async fn handler(
    State(users): State<UserService>,
    Path(id): Path<String>,
    Valid(changes): Valid<UpdateUserBody>,
) -> Result<Json<Envelope<UserResponse>>> {
    let user = users
        .update_user(&id, changes)
        .await?
        .ok_or(ServerError::NotFound)?;

    Ok(Json(Envelope::data(user.into())))
}
