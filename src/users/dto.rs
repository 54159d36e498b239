use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Role, User};
use crate::validation::{char_len_between, is_valid_email, Checks, FieldError, Validate};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Body of `POST /users/create` and `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        check_name(&mut checks, &self.name);
        checks.check(
            is_valid_email(&self.email),
            "email",
            "El email debe tener un formato válido",
        );
        checks.check(
            self.password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "La contraseña debe tener al menos 6 caracteres",
        );
        checks.finish()
    }
}

/// Body of `PATCH /users/update/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        if let Some(name) = &self.name {
            check_name(&mut checks, name);
        }
        if let Some(email) = &self.email {
            checks.check(
                is_valid_email(email),
                "email",
                "El email debe tener un formato válido",
            );
        }
        if let Some(password) = &self.password {
            checks.check(
                password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "La contraseña debe tener al menos 6 caracteres",
            );
        }
        checks.finish()
    }
}

fn check_name(checks: &mut Checks, name: &str) {
    let name = name.trim();
    checks
        .check(!name.is_empty(), "name", "El nombre es requerido")
        .check(
            name.is_empty() || char_len_between(name, 2, usize::MAX),
            "name",
            "El nombre debe tener al menos 2 caracteres",
        )
        .check(
            char_len_between(name, 0, 100),
            "name",
            "El nombre no puede exceder 100 caracteres",
        );
}

/// Projection returned by the user endpoints; the hash never leaves the crate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(rename = "created_at", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updated_at", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
