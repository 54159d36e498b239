use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponState {
    #[serde(rename = "activo", alias = "ACTIVE")]
    Active,
    #[serde(rename = "inactivo", alias = "INACTIVE")]
    Inactive,
}

impl CouponState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponState::Active => "activo",
            CouponState::Inactive => "inactivo",
        }
    }
}

impl FromStr for CouponState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activo" => Ok(CouponState::Active),
            "inactivo" => Ok(CouponState::Inactive),
            other => anyhow::bail!("unknown coupon state {other:?}"),
        }
    }
}

/// Raw `coupons` row.
#[derive(Debug, FromRow)]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub value: Decimal,
    pub expiration_date: OffsetDateTime,
    pub state: String,
    pub redeemed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub value: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub expiration_date: OffsetDateTime,
    pub state: CouponState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub redeemed_at: Option<OffsetDateTime>,
    #[serde(rename = "created_at", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updated_at", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Coupon {
    pub fn is_redeemed(&self) -> bool {
        self.redeemed_at.is_some()
    }
}

impl TryFrom<CouponRow> for Coupon {
    type Error = anyhow::Error;

    fn try_from(r: CouponRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            code: r.code,
            description: r.description,
            value: r.value,
            expiration_date: r.expiration_date,
            state: r.state.parse()?,
            redeemed_at: r.redeemed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub description: Option<String>,
    pub value: Decimal,
    pub expiration_date: OffsetDateTime,
    pub state: CouponState,
}

/// Column values to overwrite; `None` leaves the column untouched.
/// `redeemed_at` is set only through `CouponRepository::redeem`.
#[derive(Debug, Clone, Default)]
pub struct CouponChanges {
    pub code: Option<String>,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub expiration_date: Option<OffsetDateTime>,
    pub state: Option<CouponState>,
}
