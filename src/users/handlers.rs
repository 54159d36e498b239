use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateUserRequest, UpdateUserRequest, UserView};
use crate::{
    error::AppResult,
    state::AppState,
    validation::{ApiPath, ValidJson},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/all", get(find_all))
        .route("/users/getone/:id", get(find_one))
        .route("/users/create", post(create))
        .route("/users/update/:id", patch(update))
        .route("/users/delete/:id", delete(remove))
}

#[instrument(skip(state))]
pub async fn find_all(State(state): State<AppState>) -> AppResult<Json<Vec<UserView>>> {
    Ok(Json(state.users.find_all().await?))
}

#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<UserView>> {
    Ok(Json(state.users.find_one(id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let user = state.users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    Ok(Json(state.users.update(id, payload).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.users.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
