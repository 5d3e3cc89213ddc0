//! In-memory user repository used by tests.

use std::sync::RwLock;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::error::{Result, ServerError, ValidationFailure};
use crate::user::{DUPLICATE_EMAIL, User, UserChanges, UserRepository};

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ServerError {
    ServerError::Internal {
        details: "memory repository lock poisoned".into(),
    }
}

fn duplicate() -> ServerError {
    ValidationFailure::single("email", DUPLICATE_EMAIL).into()
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(duplicate());
        }

        users.push(user.clone());
        Ok(())
    }

    async fn find_active(&self) -> Result<Vec<User>> {
        let users = self.users.read().map_err(poisoned)?;
        let mut active: Vec<User> =
            users.iter().filter(|u| u.is_active).cloned().collect();
        active.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
        });

        Ok(active)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .iter()
            .find(|u| u.is_active && u.email == email)
            .cloned())
    }

    async fn update(
        &self,
        id: ObjectId,
        changes: &UserChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut users = self.users.write().map_err(poisoned)?;
        let Some(index) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };

        let taken = changes.email.as_ref().is_some_and(|email| {
            users.iter().any(|u| u.id != id && &u.email == email)
        });
        if taken {
            return Err(duplicate());
        }

        let user = &mut users[index];
        user.apply(changes, now);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: ObjectId) -> Result<Option<User>> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index)))
    }
}
