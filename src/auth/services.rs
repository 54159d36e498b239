use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    ChangePasswordRequest, LoginResponse, MessageResponse, PublicUser, RegisterRequest,
    RegisterResponse,
};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::users::services::UserDirectory;

/// Login, registration and password changes on top of the user directory.
pub struct AuthService {
    users: Arc<UserDirectory>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<UserDirectory>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// `None` for an unknown email and for a wrong password alike.
    #[instrument(skip(self, password))]
    pub async fn validate_user(&self, email: &str, password: &str) -> AppResult<Option<PublicUser>> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!("login unknown email");
            return Ok(None);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Ok(None);
        }

        Ok(Some(user.into()))
    }

    pub fn login(&self, user: PublicUser) -> AppResult<LoginResponse> {
        let access_token = self.keys.sign(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse { access_token, user })
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterRequest) -> AppResult<RegisterResponse> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict("El email ya está registrado".into()));
        }

        let user = self.users.create(input).await?;
        info!(user_id = %user.id, "user registered");
        Ok(RegisterResponse {
            message: "Usuario registrado exitosamente".into(),
            user,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordRequest,
    ) -> AppResult<MessageResponse> {
        let user = self.users.find_record(user_id).await?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            warn!(%user_id, "wrong current password");
            return Err(AppError::BadRequest(
                "La contraseña actual es incorrecta".into(),
            ));
        }

        if input.current_password == input.new_password {
            warn!(%user_id, "new password equals current");
            return Err(AppError::BadRequest(
                "La nueva contraseña debe ser diferente a la actual".into(),
            ));
        }

        let hash = hash_password(&input.new_password)?;
        self.users.set_password_hash(user_id, hash).await?;

        info!(%user_id, "password changed");
        Ok(MessageResponse {
            message: "Contraseña actualizada exitosamente".into(),
        })
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<PublicUser> {
        match self.users.find_record(user_id).await {
            Ok(user) => Ok(user.into()),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthorized("User not found".into())),
            Err(e) => Err(e),
        }
    }
}
