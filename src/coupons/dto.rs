use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

use super::repo_types::{Coupon, CouponState};
use crate::validation::{char_len_between, Checks, FieldError, Validate};

/// NUMERIC(10, 2) bounds, minus zero.
fn value_bounds() -> (Decimal, Decimal) {
    (Decimal::new(1, 2), Decimal::new(9_999_999_999, 2))
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_expiration(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(ts.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

fn check_code(checks: &mut Checks, code: &str) {
    checks
        .check(!code.is_empty(), "code", "El código es requerido")
        .check(
            code.is_empty() || char_len_between(code, 3, usize::MAX),
            "code",
            "El código debe tener al menos 3 caracteres",
        )
        .check(
            char_len_between(code, 0, 50),
            "code",
            "El código no puede exceder 50 caracteres",
        );
}

fn check_description(checks: &mut Checks, description: &str) {
    checks
        .check(
            char_len_between(description, 5, usize::MAX),
            "description",
            "La descripción debe tener al menos 5 caracteres",
        )
        .check(
            char_len_between(description, 0, 255),
            "description",
            "La descripción no puede exceder 255 caracteres",
        );
}

fn check_value(checks: &mut Checks, value: Decimal) {
    let (min, max) = value_bounds();
    checks
        .check(value >= min, "value", "El valor debe ser mayor a 0")
        .check(
            value <= max,
            "value",
            "El valor no puede exceder 99999999.99",
        );
}

fn check_expiration(checks: &mut Checks, raw: &str) {
    checks.check(
        parse_expiration(raw).is_some(),
        "expirationDate",
        "La fecha de expiración debe ser una fecha válida",
    );
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub code: String,
    pub description: Option<String>,
    pub value: Decimal,
    pub expiration_date: String,
    pub state: Option<CouponState>,
}

impl Validate for CreateCouponRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        check_code(&mut checks, &self.code);
        if let Some(description) = &self.description {
            check_description(&mut checks, description);
        }
        check_value(&mut checks, self.value);
        check_expiration(&mut checks, &self.expiration_date);
        checks.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub expiration_date: Option<String>,
    pub state: Option<CouponState>,
}

impl Validate for UpdateCouponRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        if let Some(code) = &self.code {
            check_code(&mut checks, code);
        }
        if let Some(description) = &self.description {
            check_description(&mut checks, description);
        }
        if let Some(value) = self.value {
            check_value(&mut checks, value);
        }
        if let Some(raw) = &self.expiration_date {
            check_expiration(&mut checks, raw);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemCouponRequest {
    pub code: String,
}

impl Validate for RedeemCouponRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        check_code(&mut checks, &self.code);
        checks.finish()
    }
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub message: String,
    pub coupon: Coupon,
}
