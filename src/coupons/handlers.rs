use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateCouponRequest, RedeemCouponRequest, RedeemResponse, UpdateCouponRequest};
use super::repo_types::Coupon;
use crate::{
    error::AppResult,
    state::AppState,
    validation::{ApiPath, ValidJson},
};

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons/all", get(find_all))
        .route("/coupons/redeemed", get(find_redeemed))
        .route("/coupons/getone/:id", get(find_one))
        .route("/coupons/create", post(create))
        .route("/coupons/update/:id", patch(update))
        .route("/coupons/delete/:id", delete(remove))
        .route("/coupons/redeem", post(redeem))
}

#[instrument(skip(state))]
pub async fn find_all(State(state): State<AppState>) -> AppResult<Json<Vec<Coupon>>> {
    Ok(Json(state.coupons.find_all().await?))
}

#[instrument(skip(state))]
pub async fn find_redeemed(State(state): State<AppState>) -> AppResult<Json<Vec<Coupon>>> {
    Ok(Json(state.coupons.find_redeemed_coupons().await?))
}

#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Coupon>> {
    Ok(Json(state.coupons.find_one(id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateCouponRequest>,
) -> AppResult<(StatusCode, Json<Coupon>)> {
    let coupon = state.coupons.create(payload).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(payload): ValidJson<UpdateCouponRequest>,
) -> AppResult<Json<Coupon>> {
    Ok(Json(state.coupons.update(id, payload).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.coupons.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn redeem(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RedeemCouponRequest>,
) -> AppResult<Json<RedeemResponse>> {
    Ok(Json(state.coupons.redeem_coupon(payload).await?))
}
