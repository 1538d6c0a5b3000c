//! Order totals and shipping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Breakdown of an order's amounts.
///
/// `total = subtotal - discount + shipping`, always. The stored `discount`
/// is the effective one: negative inputs become zero and the discount never
/// exceeds the subtotal, so the total is never below the shipping fee.
/// Amounts are taken as given; callers round line totals and discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals from raw amounts.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount: Decimal, shipping: Decimal) -> Self {
        let subtotal = subtotal.max(Decimal::ZERO);
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        let shipping = shipping.max(Decimal::ZERO);

        Self {
            subtotal,
            discount,
            shipping,
            total: subtotal - discount + shipping,
        }
    }
}

/// Flat-rate shipping with an optional free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Fee charged when the threshold is not met.
    pub flat_fee: Decimal,
    /// Discounted subtotal at or above which shipping is free.
    pub free_over: Option<Decimal>,
}

impl ShippingPolicy {
    /// Shipping fee for a cart.
    ///
    /// Empty carts ship for free so that an empty checkout summary shows zero.
    #[must_use]
    pub fn fee(&self, subtotal: Decimal, discount: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let discounted = subtotal - discount.max(Decimal::ZERO).min(subtotal);
        match self.free_over {
            Some(threshold) if discounted >= threshold => Decimal::ZERO,
            _ => self.flat_fee.max(Decimal::ZERO),
        }
    }

    /// Convenience: totals for `subtotal` and `discount` under this policy.
    #[must_use]
    pub fn totals(&self, subtotal: Decimal, discount: Decimal) -> OrderTotals {
        OrderTotals::compute(subtotal, discount, self.fee(subtotal, discount))
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Decimal::new(500, 2),
            free_over: Some(Decimal::from(75)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_total_identity_for_non_negative_inputs() {
        let cases = [
            (0, 0, 0),
            (10_000, 0, 500),
            (10_000, 2_500, 500),
            (10_000, 10_000, 0),
            (4_999, 1, 999),
            (123_456, 23_456, 1_250),
        ];
        for (subtotal, discount, shipping) in cases {
            let totals = OrderTotals::compute(d(subtotal), d(discount), d(shipping));
            assert_eq!(
                totals.total,
                d(subtotal) - d(discount) + d(shipping),
                "case {subtotal}/{discount}/{shipping}"
            );
        }
    }

    #[test]
    fn test_total_identity_holds_below_a_cent() {
        let subtotal = Decimal::new(100_005, 3);
        let discount = Decimal::new(10_004, 3);
        let shipping = Decimal::new(4_995, 3);

        let totals = OrderTotals::compute(subtotal, discount, shipping);
        assert_eq!(totals.subtotal, subtotal);
        assert_eq!(totals.discount, discount);
        assert_eq!(totals.total, subtotal - discount + shipping);
        assert_eq!(totals.total, Decimal::new(94_996, 3));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let totals = OrderTotals::compute(d(2_000), d(5_000), d(500));
        assert_eq!(totals.discount, d(2_000));
        assert_eq!(totals.total, d(500));
    }

    #[test]
    fn test_negative_inputs_treated_as_zero() {
        let totals = OrderTotals::compute(d(-100), d(-100), d(-100));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_shipping_free_over_threshold_after_discount() {
        let policy = ShippingPolicy {
            flat_fee: d(500),
            free_over: Some(d(7_500)),
        };
        assert_eq!(policy.fee(d(8_000), Decimal::ZERO), Decimal::ZERO);
        // The discount drops the cart below the threshold.
        assert_eq!(policy.fee(d(8_000), d(1_000)), d(500));
        assert_eq!(policy.fee(d(7_500), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(policy.fee(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_policy_without_threshold_always_charges() {
        let policy = ShippingPolicy {
            flat_fee: d(700),
            free_over: None,
        };
        let totals = policy.totals(d(100_000), Decimal::ZERO);
        assert_eq!(totals.shipping, d(700));
        assert_eq!(totals.total, d(100_700));
    }
}
