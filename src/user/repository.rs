//! Handle database requests.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;

use crate::error::{Result, ValidationFailure};
use crate::user::{DUPLICATE_EMAIL, User, UserChanges};

/// MongoDB code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new [`User`]. Fails on duplicate email.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Every active [`User`], newest first.
    async fn find_active(&self) -> Result<Vec<User>>;

    /// Find a [`User`] by identifier, active or not.
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>>;

    /// Find an active [`User`] using an already normalized email.
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Apply `changes` and return the post-update [`User`].
    async fn update(
        &self,
        id: ObjectId,
        changes: &UserChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// Permanently remove a [`User`], returning its last state.
    async fn delete(&self, id: ObjectId) -> Result<Option<User>>;
}

/// MongoDB user repository.
#[derive(Clone, Debug)]
pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    /// Create a new [`MongoUserRepository`].
    pub fn new(collection: Collection<User>) -> Self {
        Self { collection }
    }
}

/// Turn unique index violations into a field error.
fn catch_duplicate(err: mongodb::error::Error) -> crate::error::ServerError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    };

    if duplicate {
        ValidationFailure::single("email", DUPLICATE_EMAIL).into()
    } else {
        err.into()
    }
}

/// `$set` document for the supplied fields.
fn set_document(changes: &UserChanges, now: DateTime<Utc>) -> Document {
    let mut set = doc! { "updatedAt": bson::DateTime::from_chrono(now) };

    if let Some(name) = &changes.name {
        set.insert("name", name.as_str());
    }
    if let Some(email) = &changes.email {
        set.insert("email", email.as_str());
    }
    if let Some(password) = &changes.password {
        set.insert("password", password.as_str());
    }
    if let Some(is_active) = changes.is_active {
        set.insert("isActive", is_active);
    }

    set
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        self.collection
            .insert_one(user)
            .await
            .map_err(catch_duplicate)?;

        Ok(())
    }

    async fn find_active(&self) -> Result<Vec<User>> {
        let cursor = self
            .collection
            .find(doc! { "isActive": true })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .collection
            .find_one(doc! { "email": email, "isActive": true })
            .await?)
    }

    async fn update(
        &self,
        id: ObjectId,
        changes: &UserChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": set_document(changes, now) },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(catch_duplicate)
    }

    async fn delete(&self, id: ObjectId) -> Result<Option<User>> {
        Ok(self.collection.find_one_and_delete(doc! { "_id": id }).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_document_only_supplied_fields() {
        let now = Utc::now();
        let set = set_document(
            &UserChanges {
                email: Some("new@example.com".into()),
                is_active: Some(false),
                ..Default::default()
            },
            now,
        );

        assert_eq!(set.get_str("email").unwrap(), "new@example.com");
        assert!(!set.get_bool("isActive").unwrap());
        assert!(set.get_datetime("updatedAt").is_ok());
        assert!(!set.contains_key("name"));
        assert!(!set.contains_key("password"));
    }

    #[test]
    fn test_deactivate_document() {
        let set = set_document(&UserChanges::deactivate(), Utc::now());
        assert_eq!(set.len(), 2);
    }
}
