mod constraints;
#[cfg(test)]
pub mod memory;
mod repository;
mod service;

pub use constraints::*;
pub use repository::*;
pub use service::*;

use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    /// Stored as received.
    pub password: String,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Apply present fields of `changes`, stamping `updated_at`.
    pub fn apply(&mut self, changes: &UserChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(password) = &changes.password {
            self.password = password.clone();
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}

/// Public representation of a [`User`]. Has no password field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Data needed to create a [`User`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial update of a [`User`]. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    /// Changes performing a soft delete.
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: ObjectId::new(),
            name: "John Doe".into(),
            email: "john@example.com".into(),
            password: "password123".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_response_never_contains_password() {
        let json = serde_json::to_value(UserResponse::from(user())).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["name"], "John Doe");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["_id"].as_str().unwrap().len(), 24);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_document_field_names() {
        let document = bson::to_document(&user()).unwrap();

        assert!(document.get_object_id("_id").is_ok());
        assert!(document.get_bool("isActive").unwrap());
        assert!(document.get_datetime("createdAt").is_ok());
        assert!(document.get_datetime("updatedAt").is_ok());
        assert_eq!(document.get_str("password").unwrap(), "password123");
    }

    #[test]
    fn test_apply_partial_changes() {
        let mut user = user();
        let later = user.updated_at + chrono::Duration::seconds(5);
        let changes = UserChanges {
            name: Some("Updated Name".into()),
            ..Default::default()
        };

        user.apply(&changes, later);
        assert_eq!(user.name, "Updated Name");
        assert_eq!(user.email, "john@example.com");
        assert_eq!(user.updated_at, later);

        user.apply(&UserChanges::deactivate(), later);
        assert!(!user.is_active);
    }
}
