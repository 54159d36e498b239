use std::sync::Arc;

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    parse_expiration, CreateCouponRequest, RedeemCouponRequest, RedeemResponse,
    UpdateCouponRequest,
};
use super::repo::CouponRepository;
use super::repo_types::{Coupon, CouponChanges, CouponState, NewCoupon};
use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};

const CODE_TAKEN: &str = "El código del cupón ya está en uso";

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Cupón con ID {id} no encontrado"))
}

fn map_write_error(e: anyhow::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(CODE_TAKEN.into())
    } else {
        AppError::Internal(e)
    }
}

fn money(value: Decimal) -> Decimal {
    let mut v = value;
    v.rescale(2);
    v
}

fn expiration(raw: &str) -> AppResult<OffsetDateTime> {
    parse_expiration(raw).ok_or_else(|| {
        AppError::BadRequest("La fecha de expiración debe ser una fecha válida".into())
    })
}

/// Why a coupon can't be redeemed at `now`. A redeemed coupon is terminal and
/// always reports as redeemed; otherwise deactivation wins over expiry.
fn check_redeemable(coupon: &Coupon, now: OffsetDateTime) -> AppResult<()> {
    if coupon.is_redeemed() {
        return Err(AppError::BadRequest("El cupón ya ha sido canjeado".into()));
    }
    if coupon.state != CouponState::Active {
        return Err(AppError::BadRequest("El cupón no está activo".into()));
    }
    if coupon.expiration_date < now {
        return Err(AppError::BadRequest("El cupón ha expirado".into()));
    }
    Ok(())
}

/// Coupon CRUD plus the one-way redemption transition.
pub struct CouponLedger {
    repo: Arc<dyn CouponRepository>,
}

impl CouponLedger {
    pub fn new(repo: Arc<dyn CouponRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateCouponRequest) -> AppResult<Coupon> {
        if self.repo.find_by_code(&input.code, true).await?.is_some() {
            warn!("coupon code already in use");
            return Err(AppError::Conflict(CODE_TAKEN.into()));
        }

        let coupon = self
            .repo
            .insert(NewCoupon {
                expiration_date: expiration(&input.expiration_date)?,
                code: input.code,
                description: input.description,
                value: money(input.value),
                state: input.state.unwrap_or(CouponState::Active),
            })
            .await
            .map_err(map_write_error)?;

        info!(coupon_id = %coupon.id, "coupon created");
        Ok(coupon)
    }

    pub async fn find_all(&self) -> AppResult<Vec<Coupon>> {
        Ok(self.repo.list().await?)
    }

    pub async fn find_redeemed_coupons(&self) -> AppResult<Vec<Coupon>> {
        Ok(self.repo.list_redeemed().await?)
    }

    pub async fn find_one(&self, id: Uuid) -> AppResult<Coupon> {
        self.repo.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Coupon>> {
        Ok(self.repo.find_by_code(code, false).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: UpdateCouponRequest) -> AppResult<Coupon> {
        let current = self.find_one(id).await?;

        if let Some(code) = &patch.code {
            if *code != current.code && self.repo.find_by_code(code, true).await?.is_some() {
                warn!(%code, "coupon code already in use");
                return Err(AppError::Conflict(CODE_TAKEN.into()));
            }
        }

        if patch.state == Some(CouponState::Active) && current.is_redeemed() {
            warn!(coupon_id = %id, "attempt to reactivate a redeemed coupon");
            return Err(AppError::BadRequest(
                "Un cupón canjeado no puede reactivarse".into(),
            ));
        }

        let changes = CouponChanges {
            code: patch.code,
            description: patch.description,
            value: patch.value.map(money),
            expiration_date: patch.expiration_date.as_deref().map(expiration).transpose()?,
            state: patch.state,
        };

        let coupon = self
            .repo
            .update(id, changes)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| not_found(id))?;

        info!(coupon_id = %coupon.id, "coupon updated");
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.soft_delete(id, OffsetDateTime::now_utc()).await? {
            return Err(not_found(id));
        }
        info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn redeem_coupon(&self, input: RedeemCouponRequest) -> AppResult<RedeemResponse> {
        let now = OffsetDateTime::now_utc();

        let coupon = self
            .find_by_code(&input.code)
            .await?
            .ok_or_else(|| AppError::NotFound("Cupón no encontrado".into()))?;
        if let Err(e) = check_redeemable(&coupon, now) {
            warn!(coupon_id = %coupon.id, reason = %e, "redemption rejected");
            return Err(e);
        }

        let Some(coupon) = self.repo.redeem(&input.code, now).await? else {
            // Lost a race with another writer; report what the row looks like now.
            warn!(coupon_id = %coupon.id, "conditional redemption matched no row");
            let current = self
                .find_by_code(&input.code)
                .await?
                .ok_or_else(|| AppError::NotFound("Cupón no encontrado".into()))?;
            check_redeemable(&current, now)?;
            return Err(AppError::BadRequest("El cupón ya ha sido canjeado".into()));
        };

        info!(coupon_id = %coupon.id, value = %coupon.value, "coupon redeemed");
        Ok(RedeemResponse {
            message: format!("Cupón canjeado exitosamente. Valor: ${}", coupon.value),
            coupon,
        })
    }
}
