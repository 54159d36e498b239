use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, PublicUser,
            RegisterRequest, RegisterResponse,
        },
        jwt::AuthUser,
    },
    error::{AppError, AppResult},
    state::AppState,
    validation::{ApiPath, ValidJson},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/change-password/:user_id", post(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .auth
        .validate_user(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Credenciales inválidas".into()))?;
    Ok(Json(state.auth.login(user)?))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let resp = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ValidJson(payload): ValidJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(state.auth.change_password(user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.auth.me(user_id).await?))
}
