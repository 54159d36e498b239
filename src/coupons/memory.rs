//! In-memory `CouponRepository` used by tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::CouponRepository;
use super::repo_types::{Coupon, CouponChanges, CouponState, NewCoupon};
use crate::db::fake::unique_violation;

struct Stored {
    coupon: Coupon,
    deleted_at: Option<OffsetDateTime>,
}

impl Stored {
    fn live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Codes are unique across tombstoned rows too, like the `coupons_code_key` index.
#[derive(Default)]
pub struct InMemoryCouponRepository {
    rows: Mutex<Vec<Stored>>,
}

#[async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Coupon>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.coupon.id == id && s.live())
            .map(|s| s.coupon.clone()))
    }

    async fn find_by_code(&self, code: &str, include_deleted: bool) -> anyhow::Result<Option<Coupon>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|s| s.coupon.code == code && (include_deleted || s.live()))
            .map(|s| s.coupon.clone()))
    }

    async fn list(&self) -> anyhow::Result<Vec<Coupon>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|s| s.live()).map(|s| s.coupon.clone()).collect())
    }

    async fn list_redeemed(&self) -> anyhow::Result<Vec<Coupon>> {
        let rows = self.rows.lock().unwrap();
        let mut redeemed: Vec<Coupon> = rows
            .iter()
            .filter(|s| s.live())
            .map(|s| &s.coupon)
            .filter(|c| c.is_redeemed() && c.state == CouponState::Inactive)
            .cloned()
            .collect();
        redeemed.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at));
        Ok(redeemed)
    }

    async fn insert(&self, coupon: NewCoupon) -> anyhow::Result<Coupon> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|s| s.coupon.code == coupon.code) {
            return Err(unique_violation("coupons_code_key"));
        }
        let now = OffsetDateTime::now_utc();
        let created = Coupon {
            id: Uuid::new_v4(),
            code: coupon.code,
            description: coupon.description,
            value: coupon.value,
            expiration_date: coupon.expiration_date,
            state: coupon.state,
            redeemed_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(Stored {
            coupon: created.clone(),
            deleted_at: None,
        });
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: CouponChanges) -> anyhow::Result<Option<Coupon>> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(code) = &changes.code {
            if rows.iter().any(|s| s.coupon.id != id && s.coupon.code == *code) {
                return Err(unique_violation("coupons_code_key"));
            }
        }
        let Some(stored) = rows.iter_mut().find(|s| s.coupon.id == id && s.live()) else {
            return Ok(None);
        };
        let coupon = &mut stored.coupon;
        if let Some(code) = changes.code {
            coupon.code = code;
        }
        if let Some(description) = changes.description {
            coupon.description = Some(description);
        }
        if let Some(value) = changes.value {
            coupon.value = value;
        }
        if let Some(expiration) = changes.expiration_date {
            coupon.expiration_date = expiration;
        }
        if let Some(state) = changes.state {
            coupon.state = state;
        }
        coupon.updated_at = OffsetDateTime::now_utc();
        Ok(Some(coupon.clone()))
    }

    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|s| s.coupon.id == id && s.live()) {
            Some(stored) => {
                stored.deleted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn redeem(&self, code: &str, at: OffsetDateTime) -> anyhow::Result<Option<Coupon>> {
        let mut rows = self.rows.lock().unwrap();
        let target = rows.iter_mut().filter(|s| s.live()).map(|s| &mut s.coupon).find(|c| {
            c.code == code
                && c.state == CouponState::Active
                && c.redeemed_at.is_none()
                && c.expiration_date >= at
        });
        Ok(target.map(|coupon| {
            coupon.redeemed_at = Some(at);
            coupon.state = CouponState::Inactive;
            coupon.updated_at = at;
            coupon.clone()
        }))
    }
}
