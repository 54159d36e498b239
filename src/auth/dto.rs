use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::dto::{UserView, MIN_PASSWORD_LEN};
use crate::users::repo_types::{Role, User};
use crate::validation::{is_valid_email, Checks, FieldError, Validate};

pub use crate::users::dto::CreateUserRequest as RegisterRequest;

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .check(
                is_valid_email(&self.email),
                "email",
                "El email debe tener un formato válido",
            )
            .check(
                !self.password.is_empty(),
                "password",
                "La contraseña es requerida",
            )
            .finish()
    }
}

/// Request body for `POST /auth/change-password/:userId`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .check(
                !self.current_password.is_empty(),
                "currentPassword",
                "La contraseña actual es requerida",
            )
            .check(
                self.new_password.chars().count() >= MIN_PASSWORD_LEN,
                "newPassword",
                "La nueva contraseña debe tener al menos 6 caracteres",
            )
            .finish()
    }
}

/// Public part of the user returned with a token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            is_active: u.is_active,
        }
    }
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
