//! Write-time constraints of the [`User`](super::User) record.
//!
//! Setters run first, then every validator; all violations are collected.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::ValidationFailure;
use crate::user::{NewUser, UserChanges};

/// Maximum `name` length, in characters.
pub const NAME_MAX_LENGTH: usize = 50;
/// Minimum `password` length, in characters.
pub const PASSWORD_MIN_LENGTH: usize = 6;

pub const DUPLICATE_EMAIL: &str = "Email already exists";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").unwrap()
});

/// Trim surrounding whitespace.
pub fn sanitize_name(name: &str) -> String {
    name.trim().to_owned()
}

/// Trim surrounding whitespace and lowercase.
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_name(name: &str, failure: &mut ValidationFailure) {
    if name.is_empty() {
        failure.add("name", "Name is required");
    } else if name.chars().count() > NAME_MAX_LENGTH {
        failure.add("name", "Name cannot be more than 50 characters");
    }
}

fn check_email(email: &str, failure: &mut ValidationFailure) {
    if email.is_empty() {
        failure.add("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        failure.add("email", "Please enter a valid email");
    }
}

fn check_password(password: &str, failure: &mut ValidationFailure) {
    if password.is_empty() {
        failure.add("password", "Password is required");
    } else if password.chars().count() < PASSWORD_MIN_LENGTH {
        failure.add("password", "Password must be at least 6 characters");
    }
}

impl NewUser {
    /// Apply setters then validate every field.
    pub fn constrain(self) -> Result<Self, ValidationFailure> {
        let user = Self {
            name: sanitize_name(&self.name),
            email: sanitize_email(&self.email),
            password: self.password,
        };

        let mut failure = ValidationFailure::new();
        check_name(&user.name, &mut failure);
        check_email(&user.email, &mut failure);
        check_password(&user.password, &mut failure);

        failure.into_result(user)
    }
}

impl UserChanges {
    /// Apply setters then validate supplied fields only.
    pub fn constrain(self) -> Result<Self, ValidationFailure> {
        let changes = Self {
            name: self.name.as_deref().map(sanitize_name),
            email: self.email.as_deref().map(sanitize_email),
            password: self.password,
            is_active: self.is_active,
        };

        let mut failure = ValidationFailure::new();
        if let Some(name) = &changes.name {
            check_name(name, &mut failure);
        }
        if let Some(email) = &changes.email {
            check_email(email, &mut failure);
        }
        if let Some(password) = &changes.password {
            check_password(password, &mut failure);
        }

        failure.into_result(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_setters() {
        let user = new_user("  John Doe ", " John@Example.COM ", " secret ")
            .constrain()
            .unwrap();

        assert_eq!(user.name, "John Doe");
        assert_eq!(user.email, "john@example.com");
        // password is kept verbatim.
        assert_eq!(user.password, " secret ");
    }

    #[test]
    fn test_email_pattern() {
        for email in ["john@example.com", "a.b-c@mail.example.org", "x_y@d.io"] {
            assert!(EMAIL_RE.is_match(email), "{email} should match");
        }
        for email in ["invalid-email", "a@b", "@example.com", "a@b.toolong", "a b@c.com"] {
            assert!(!EMAIL_RE.is_match(email), "{email} should not match");
        }
    }

    #[test]
    fn test_collects_every_field() {
        let failure = new_user("   ", "nope", "123").constrain().unwrap_err();
        let messages: Vec<_> =
            failure.errors().iter().map(|e| e.message.as_str()).collect();

        assert_eq!(
            messages,
            [
                "Name is required",
                "Please enter a valid email",
                "Password must be at least 6 characters"
            ]
        );
    }

    #[test]
    fn test_name_too_long() {
        let failure = new_user(&"a".repeat(51), "john@example.com", "password")
            .constrain()
            .unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(
            failure.errors()[0].message,
            "Name cannot be more than 50 characters"
        );

        assert!(
            new_user(&"é".repeat(50), "john@example.com", "password")
                .constrain()
                .is_ok()
        );
    }

    #[test]
    fn test_required() {
        let failure = new_user("", "", "").constrain().unwrap_err();
        assert_eq!(failure.errors()[1].message, "Email is required");
        assert_eq!(failure.errors()[2].message, "Password is required");
    }

    #[test]
    fn test_changes_only_supplied_fields() {
        let changes = UserChanges {
            email: Some(" NEW@Example.com".into()),
            ..Default::default()
        }
        .constrain()
        .unwrap();
        assert_eq!(changes.email.as_deref(), Some("new@example.com"));
        assert!(changes.name.is_none());

        let failure = UserChanges {
            name: Some(" ".into()),
            ..Default::default()
        }
        .constrain()
        .unwrap_err();
        assert!(failure.has("name"));
        assert!(!failure.has("email"));
    }
}
