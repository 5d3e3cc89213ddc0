use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::Result;
use crate::user::{NewUser, User, UserChanges, UserRepository, sanitize_email};

/// User manager.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(repo: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Current time at the millisecond precision MongoDB stores.
    fn now(&self) -> DateTime<Utc> {
        bson::DateTime::from_chrono(self.clock.now()).to_chrono()
    }

    /// Create a new active user.
    ///
    /// Sanitizes and validates every field; a duplicate email fails with a
    /// validation error on `email`.
    pub async fn create_user(&self, data: NewUser) -> Result<User> {
        let data = data.constrain()?;
        let now = self.now();

        let user = User {
            id: ObjectId::new(),
            name: data.name,
            email: data.email,
            password: data.password,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert(&user).await?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Every active user, newest first.
    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        self.repo.find_active().await
    }

    /// Find a user by identifier regardless of its status.
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        match parse_id(id) {
            Some(id) => self.repo.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Find an active user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.find_active_by_email(&sanitize_email(email)).await
    }

    /// Partially update a user, active or not.
    pub async fn update_user(
        &self,
        id: &str,
        changes: UserChanges,
    ) -> Result<Option<User>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let changes = changes.constrain()?;

        self.repo.update(id, &changes, self.now()).await
    }

    /// Soft delete a user by marking it inactive.
    pub async fn delete_user(&self, id: &str) -> Result<Option<User>> {
        let user = self.update_user(id, UserChanges::deactivate()).await?;
        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, "user deactivated");
        }
        Ok(user)
    }

    /// Permanently delete a user.
    pub async fn hard_delete_user(&self, id: &str) -> Result<Option<User>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let user = self.repo.delete(id).await?;
        if user.is_some() {
            tracing::info!(user_id = %id, "user permanently deleted");
        }
        Ok(user)
    }
}

/// Malformed identifiers resolve to nothing.
fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}
