//! Request payload rules.
//!
//! Rules are checked in table order and every failure is reported.

use serde::{Deserialize, Serialize};
use validator::{ValidateEmail, ValidateLength};

use crate::error::ValidationFailure;
use crate::user::{NewUser, UserChanges, sanitize_email, sanitize_name};

/// Payload check turning a request body into service input.
pub trait Rules {
    type Output;

    fn check(self) -> Result<Self::Output, ValidationFailure>;
}

struct Rule {
    field: &'static str,
    sanitize: fn(&str) -> String,
    predicate: fn(&String) -> bool,
    message: &'static str,
}

fn verbatim(value: &str) -> String {
    value.to_owned()
}

fn name_length(value: &String) -> bool {
    value.validate_length(Some(1), Some(50), None)
}

fn email_shape(value: &String) -> bool {
    value.validate_email()
}

fn password_length(value: &String) -> bool {
    value.validate_length(Some(6), None, None)
}

const RULES: [Rule; 3] = [
    Rule {
        field: "name",
        sanitize: sanitize_name,
        predicate: name_length,
        message: "Name must be between 1 and 50 characters",
    },
    Rule {
        field: "email",
        sanitize: sanitize_email,
        predicate: email_shape,
        message: "Please provide a valid email",
    },
    Rule {
        field: "password",
        sanitize: verbatim,
        predicate: password_length,
        message: "Password must be at least 6 characters long",
    },
];

/// Run [`RULES`] over `[name, email, password]`.
///
/// Absent values are skipped unless `required`, in which case they are
/// checked as empty strings.
fn run(
    values: [Option<String>; 3],
    required: bool,
) -> Result<[Option<String>; 3], ValidationFailure> {
    let mut failure = ValidationFailure::new();
    let mut sanitized: [Option<String>; 3] = Default::default();

    for ((rule, value), slot) in RULES.iter().zip(values).zip(&mut sanitized) {
        let value = match value {
            Some(value) => value,
            None if required => String::default(),
            None => continue,
        };

        let value = (rule.sanitize)(&value);
        if !(rule.predicate)(&value) {
            failure.add(rule.field, rule.message);
        }
        *slot = Some(value);
    }

    failure.into_result(sanitized)
}

/// `POST /api/v1/users` body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Rules for CreateUserBody {
    type Output = NewUser;

    fn check(self) -> Result<NewUser, ValidationFailure> {
        let [name, email, password] =
            run([self.name, self.email, self.password], true)?;

        Ok(NewUser {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

/// `PUT /api/v1/users/{id}` body.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl Rules for UpdateUserBody {
    type Output = UserChanges;

    fn check(self) -> Result<UserChanges, ValidationFailure> {
        let [name, email, password] =
            run([self.name, self.email, self.password], false)?;

        Ok(UserChanges {
            name,
            email,
            password,
            is_active: self.is_active,
        })
    }
}
