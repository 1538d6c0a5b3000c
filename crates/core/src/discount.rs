//! Discount code validation and amounts.
//!
//! Checks run in a fixed order (active, window start, window end, usage,
//! minimum order) so the first failing rule is the one reported.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::Discount;
use crate::types::{DiscountType, round_money};

/// Why a discount cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscountRejection {
    #[error("discount code not found")]
    NotFound,
    #[error("discount code is not active")]
    Inactive,
    #[error("discount code is not valid yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code has reached its usage limit")]
    UsageLimitReached,
    #[error("order must be at least {minimum} to use this code")]
    MinimumNotMet { minimum: Decimal },
}

/// Normalise a user-entered code for lookup and storage.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validate `discount` for an order of `subtotal` at time `now`.
///
/// # Errors
///
/// Returns the first rule the discount fails.
pub fn validate(
    discount: &Discount,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(), DiscountRejection> {
    if !discount.is_active {
        return Err(DiscountRejection::Inactive);
    }
    if discount.starts_at.is_some_and(|starts| now < starts) {
        return Err(DiscountRejection::NotStarted);
    }
    if discount.ends_at.is_some_and(|ends| now > ends) {
        return Err(DiscountRejection::Expired);
    }
    if discount
        .max_uses
        .is_some_and(|max| discount.used_count >= max)
    {
        return Err(DiscountRejection::UsageLimitReached);
    }
    if let Some(minimum) = discount.min_order_amount
        && subtotal < minimum
    {
        return Err(DiscountRejection::MinimumNotMet { minimum });
    }
    Ok(())
}

/// Amount taken off `subtotal`, clamped to `0..=subtotal`.
#[must_use]
pub fn amount(discount: &Discount, subtotal: Decimal) -> Decimal {
    let subtotal = subtotal.max(Decimal::ZERO);
    let raw = match discount.discount_type {
        DiscountType::Percentage => {
            let pct = discount.value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            subtotal * pct / Decimal::ONE_HUNDRED
        }
        DiscountType::FixedAmount => discount.value,
    };
    round_money(raw.clamp(Decimal::ZERO, subtotal))
}

/// Validate and compute in one step.
///
/// # Errors
///
/// Returns the validation failure, if any.
pub fn apply(
    discount: &Discount,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, DiscountRejection> {
    validate(discount, subtotal, now)?;
    Ok(amount(discount, subtotal))
}

/// Check a discount definition before it is written.
///
/// # Errors
///
/// Returns a message describing the invalid field.
pub fn check_definition(
    discount_type: DiscountType,
    value: Decimal,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), String> {
    match discount_type {
        DiscountType::Percentage if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED => {
            return Err("percentage must be greater than 0 and at most 100".to_string());
        }
        DiscountType::FixedAmount if value <= Decimal::ZERO => {
            return Err("fixed amount must be greater than 0".to_string());
        }
        _ => {}
    }
    if let (Some(starts), Some(ends)) = (starts_at, ends_at)
        && ends <= starts
    {
        return Err("end date must be after start date".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::types::DiscountId;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn discount(discount_type: DiscountType, value: Decimal) -> Discount {
        Discount {
            id: DiscountId::new(1),
            code: "SPRING".to_string(),
            description: None,
            discount_type,
            value,
            min_order_amount: None,
            max_uses: None,
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_expired_after_end_date() {
        let mut d = discount(DiscountType::Percentage, Decimal::TEN);
        d.ends_at = Some(now() - Duration::seconds(1));
        assert_eq!(
            validate(&d, Decimal::ONE_HUNDRED, now()),
            Err(DiscountRejection::Expired)
        );
    }

    #[test]
    fn test_still_valid_at_exact_end() {
        let mut d = discount(DiscountType::Percentage, Decimal::TEN);
        d.ends_at = Some(now());
        assert_eq!(validate(&d, Decimal::ONE_HUNDRED, now()), Ok(()));
    }

    #[test]
    fn test_not_started() {
        let mut d = discount(DiscountType::Percentage, Decimal::TEN);
        d.starts_at = Some(now() + Duration::days(1));
        assert_eq!(
            validate(&d, Decimal::ONE_HUNDRED, now()),
            Err(DiscountRejection::NotStarted)
        );
    }

    #[test]
    fn test_inactive_reported_first() {
        let mut d = discount(DiscountType::Percentage, Decimal::TEN);
        d.is_active = false;
        d.ends_at = Some(now() - Duration::days(1));
        assert_eq!(
            validate(&d, Decimal::ONE_HUNDRED, now()),
            Err(DiscountRejection::Inactive)
        );
    }

    #[test]
    fn test_usage_limit() {
        let mut d = discount(DiscountType::FixedAmount, Decimal::TEN);
        d.max_uses = Some(3);
        d.used_count = 3;
        assert_eq!(
            validate(&d, Decimal::ONE_HUNDRED, now()),
            Err(DiscountRejection::UsageLimitReached)
        );
        d.used_count = 2;
        assert_eq!(validate(&d, Decimal::ONE_HUNDRED, now()), Ok(()));
    }

    #[test]
    fn test_minimum_order() {
        let mut d = discount(DiscountType::FixedAmount, Decimal::TEN);
        d.min_order_amount = Some(Decimal::from(50));
        assert_eq!(
            validate(&d, Decimal::from(49), now()),
            Err(DiscountRejection::MinimumNotMet {
                minimum: Decimal::from(50)
            })
        );
        assert_eq!(validate(&d, Decimal::from(50), now()), Ok(()));
    }

    #[test]
    fn test_percentage_amount_rounds_to_cents() {
        let d = discount(DiscountType::Percentage, Decimal::new(15, 0));
        // 15% of 33.33 = 4.9995
        assert_eq!(amount(&d, Decimal::new(3333, 2)), Decimal::new(500, 2));
    }

    #[test]
    fn test_amount_never_exceeds_subtotal() {
        let fixed = discount(DiscountType::FixedAmount, Decimal::from(80));
        assert_eq!(amount(&fixed, Decimal::from(30)), Decimal::from(30));

        let pct = discount(DiscountType::Percentage, Decimal::from(250));
        assert_eq!(amount(&pct, Decimal::from(40)), Decimal::from(40));
    }

    #[test]
    fn test_apply_returns_amount_when_valid() {
        let d = discount(DiscountType::Percentage, Decimal::from(20));
        assert_eq!(apply(&d, Decimal::from(50), now()), Ok(Decimal::from(10)));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  spring25 "), "SPRING25");
    }

    #[test]
    fn test_check_definition() {
        assert!(check_definition(DiscountType::Percentage, Decimal::from(100), None, None).is_ok());
        assert!(check_definition(DiscountType::Percentage, Decimal::from(101), None, None).is_err());
        assert!(check_definition(DiscountType::FixedAmount, Decimal::ZERO, None, None).is_err());
        assert!(
            check_definition(
                DiscountType::FixedAmount,
                Decimal::TEN,
                Some(now()),
                Some(now() - Duration::days(1))
            )
            .is_err()
        );
    }
}
