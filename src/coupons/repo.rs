use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Coupon, CouponChanges, CouponRow, NewCoupon};

/// Persistence contract for coupons. Lookups skip tombstoned rows unless
/// `include_deleted` is set.
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Coupon>>;
    async fn find_by_code(&self, code: &str, include_deleted: bool) -> anyhow::Result<Option<Coupon>>;
    async fn list(&self) -> anyhow::Result<Vec<Coupon>>;
    /// Redeemed coupons, most recent redemption first.
    async fn list_redeemed(&self) -> anyhow::Result<Vec<Coupon>>;
    async fn insert(&self, coupon: NewCoupon) -> anyhow::Result<Coupon>;
    async fn update(&self, id: Uuid, changes: CouponChanges) -> anyhow::Result<Option<Coupon>>;
    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool>;
    /// Marks the coupon redeemed at `at` only if it is still active,
    /// unredeemed and unexpired. `None` means nothing was updated.
    async fn redeem(&self, code: &str, at: OffsetDateTime) -> anyhow::Result<Option<Coupon>>;
}

pub struct PgCouponRepository {
    db: PgPool,
}

impl PgCouponRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COUPON_COLUMNS: &str = "id, code, description, value, expiration_date, state, \
     redeemed_at, created_at, updated_at";

fn into_coupons(rows: Vec<CouponRow>) -> anyhow::Result<Vec<Coupon>> {
    rows.into_iter().map(Coupon::try_from).collect()
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find coupon by id")?;
        row.map(Coupon::try_from).transpose()
    }

    async fn find_by_code(&self, code: &str, include_deleted: bool) -> anyhow::Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND ($2 OR deleted_at IS NULL)"
        ))
        .bind(code)
        .bind(include_deleted)
        .fetch_optional(&self.db)
        .await
        .context("find coupon by code")?;
        row.map(Coupon::try_from).transpose()
    }

    async fn list(&self) -> anyhow::Result<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE deleted_at IS NULL ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list coupons")?;
        into_coupons(rows)
    }

    async fn list_redeemed(&self) -> anyhow::Result<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            SELECT {COUPON_COLUMNS}
              FROM coupons
             WHERE deleted_at IS NULL
               AND redeemed_at IS NOT NULL
               AND state = 'inactivo'
             ORDER BY redeemed_at DESC
            "#
        ))
        .fetch_all(&self.db)
        .await
        .context("list redeemed coupons")?;
        into_coupons(rows)
    }

    async fn insert(&self, coupon: NewCoupon) -> anyhow::Result<Coupon> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            INSERT INTO coupons (id, code, description, value, expiration_date, state)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.value)
        .bind(coupon.expiration_date)
        .bind(coupon.state.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert coupon")?;
        Coupon::try_from(row)
    }

    async fn update(&self, id: Uuid, changes: CouponChanges) -> anyhow::Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            UPDATE coupons
               SET code            = COALESCE($2, code),
                   description     = COALESCE($3, description),
                   value           = COALESCE($4, value),
                   expiration_date = COALESCE($5, expiration_date),
                   state           = COALESCE($6, state),
                   updated_at      = now()
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.code)
        .bind(changes.description)
        .bind(changes.value)
        .bind(changes.expiration_date)
        .bind(changes.state.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await
        .context("update coupon")?;
        row.map(Coupon::try_from).transpose()
    }

    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE coupons SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.db)
        .await
        .context("soft delete coupon")?;
        Ok(res.rows_affected() > 0)
    }

    async fn redeem(&self, code: &str, at: OffsetDateTime) -> anyhow::Result<Option<Coupon>> {
        // Single conditional UPDATE: at most one caller sees the row come back.
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            UPDATE coupons
               SET redeemed_at = $2,
                   state       = 'inactivo',
                   updated_at  = $2
             WHERE code = $1
               AND deleted_at IS NULL
               AND state = 'activo'
               AND redeemed_at IS NULL
               AND expiration_date >= $2
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("redeem coupon")?;
        row.map(Coupon::try_from).transpose()
    }
}
