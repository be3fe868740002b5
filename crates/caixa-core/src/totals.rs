//! # Totals Calculator
//!
//! Turns cart lines and order adjustments into the amount due.
//!
//! ## Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. subtotal        = Σ unit_price × qty                               │
//! │  2. item discounts  = Σ per-line discount (clamped to each line)       │
//! │  3. order discount  = percent of (subtotal − item discounts) | fixed   │
//! │                       (a coupon replaces the manual order discount)    │
//! │  4. amount due      = subtotal − item − order + surcharge              │
//! │                       + freight (customer pays), clamped to ≥ 0        │
//! │  5. cashback earned = amount due × earn rate (reported only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card fees never enter this calculation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::error::{PaymentError, PaymentResult};
use crate::money::Money;
use crate::types::{Discount, OrderAdjustments};

// =============================================================================
// Coupon Table
// =============================================================================

/// Static coupon code → fixed discount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponTable {
    codes: BTreeMap<String, Money>,
}

impl CouponTable {
    /// Creates an empty table (every code is rejected).
    pub fn empty() -> Self {
        CouponTable {
            codes: BTreeMap::new(),
        }
    }

    /// Builds a table from `(code, cents)` pairs. Codes are stored upper case.
    pub fn from_cents<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        CouponTable {
            codes: entries
                .into_iter()
                .map(|(code, cents)| (normalize(code.as_ref()), Money::from_cents(cents)))
                .collect(),
        }
    }

    /// Resolves a code to its literal discount.
    pub fn resolve(&self, code: &str) -> PaymentResult<Money> {
        self.codes
            .get(&normalize(code))
            .copied()
            .ok_or_else(|| PaymentError::invalid_coupon(code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CouponTable {
    /// DESC10 = R$ 10,00, DESC20 = R$ 20,00.
    fn default() -> Self {
        CouponTable::from_cents([("DESC10", 1000), ("DESC20", 2000)])
    }
}

pub(crate) fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

// =============================================================================
// Totals
// =============================================================================

/// Result of the totals cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub item_discount_total: Money,
    pub order_discount: Money,
    pub surcharge: Money,
    /// Freight added to the amount due (zero when the store pays).
    pub freight_charged: Money,
    pub amount_due: Money,
    /// Cashback the customer earns on this sale (reported, never applied).
    pub cashback_earned: Money,
    /// Normalized coupon code when a coupon was applied.
    pub coupon_code: Option<String>,
}

/// Computes the totals for `lines` under `adjustments`.
///
/// ## Errors
/// - `InvalidCoupon` when `adjustments.coupon_code` is not in `coupons`
///
/// ## Example
/// ```rust
/// use caixa_core::money::Money;
/// use caixa_core::totals::{compute_totals, CouponTable};
/// use caixa_core::types::{Discount, OrderAdjustments};
///
/// let adjustments = OrderAdjustments {
///     order_discount: Discount::Fixed(Money::from_cents(500)),
///     ..OrderAdjustments::default()
/// };
/// let totals = compute_totals(&[], &adjustments, &CouponTable::default()).unwrap();
/// assert!(totals.amount_due.is_zero());
/// ```
pub fn compute_totals(
    lines: &[CartLine],
    adjustments: &OrderAdjustments,
    coupons: &CouponTable,
) -> PaymentResult<Totals> {
    let subtotal: Money = lines.iter().map(CartLine::gross_total).sum();
    let item_discount_total: Money = lines.iter().map(CartLine::discount_amount).sum();

    let (order_discount, coupon_code) = match adjustments.coupon_code.as_deref() {
        Some(code) => (coupons.resolve(code)?, Some(normalize(code))),
        None => {
            let discount = match adjustments.order_discount {
                Discount::None => Money::zero(),
                Discount::Fixed(value) => value,
                Discount::Percent(rate) => (subtotal - item_discount_total).percent_of(rate),
            };
            (discount, None)
        }
    };

    let freight_charged = adjustments.freight.chargeable();
    let amount_due = (subtotal - item_discount_total - order_discount
        + adjustments.surcharge
        + freight_charged)
        .clamp_non_negative();

    Ok(Totals {
        subtotal,
        item_discount_total,
        order_discount,
        surcharge: adjustments.surcharge,
        freight_charged,
        amount_due,
        cashback_earned: amount_due.percent_of(adjustments.cashback_earn_rate),
        coupon_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::test_product;
    use crate::cart::Cart;
    use crate::types::{Freight, FreightPayer, Rate};
    use proptest::prelude::*;

    fn cart_of(items: &[(i64, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (i, (price, qty)) in items.iter().enumerate() {
            cart.add_product(&test_product(&i.to_string(), *price), *qty)
                .unwrap();
        }
        cart
    }

    #[test]
    fn test_fixed_order_discount() {
        let cart = cart_of(&[(2500, 2), (1000, 1)]);
        let adjustments = OrderAdjustments {
            order_discount: Discount::Fixed(Money::from_cents(1500)),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
        assert_eq!(totals.subtotal.cents(), 6000);
        assert_eq!(totals.amount_due.cents(), 4500);
    }

    #[test]
    fn test_percent_order_discount_after_item_discounts() {
        let mut cart = cart_of(&[(5000, 2)]);
        cart.set_line_discount("0", Discount::Fixed(Money::from_cents(1000)))
            .unwrap();
        let adjustments = OrderAdjustments {
            order_discount: Discount::Percent(Rate::from_percent(10)),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
        assert_eq!(totals.item_discount_total.cents(), 2000);
        // 10% of (100,00 − 20,00)
        assert_eq!(totals.order_discount.cents(), 800);
        assert_eq!(totals.amount_due.cents(), 7200);
    }

    #[test]
    fn test_surcharge_and_freight() {
        let cart = cart_of(&[(10000, 1)]);
        let mut adjustments = OrderAdjustments {
            surcharge: Money::from_cents(250),
            freight: Freight::charged_to_customer(Money::from_cents(1500)),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
        assert_eq!(totals.amount_due.cents(), 11750);

        adjustments.freight.payer = FreightPayer::Store;
        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
        assert!(totals.freight_charged.is_zero());
        assert_eq!(totals.amount_due.cents(), 10250);
    }

    #[test]
    fn test_amount_due_clamped() {
        let cart = cart_of(&[(500, 1)]);
        let adjustments = OrderAdjustments {
            coupon_code: Some("DESC20".to_string()),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::default()).unwrap();
        assert_eq!(totals.order_discount.cents(), 2000);
        assert!(totals.amount_due.is_zero());
    }

    #[test]
    fn test_coupon_replaces_manual_discount() {
        let cart = cart_of(&[(10000, 1)]);
        let adjustments = OrderAdjustments {
            order_discount: Discount::Percent(Rate::from_percent(50)),
            coupon_code: Some("desc10".to_string()),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::default()).unwrap();
        assert_eq!(totals.order_discount.cents(), 1000);
        assert_eq!(totals.coupon_code.as_deref(), Some("DESC10"));
        assert_eq!(totals.amount_due.cents(), 9000);
    }

    #[test]
    fn test_unknown_coupon() {
        let cart = cart_of(&[(10000, 1)]);
        let adjustments = OrderAdjustments {
            coupon_code: Some("NOPE".to_string()),
            ..OrderAdjustments::default()
        };

        let err = compute_totals(cart.lines(), &adjustments, &CouponTable::default()).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidCoupon { .. }));
    }

    #[test]
    fn test_cashback_earned() {
        let cart = cart_of(&[(8000, 1)]);
        let adjustments = OrderAdjustments {
            cashback_earn_rate: Rate::from_percent(5),
            ..OrderAdjustments::default()
        };

        let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
        assert_eq!(totals.cashback_earned.cents(), 400);
        assert_eq!(totals.amount_due.cents(), 8000);
    }

    proptest! {
        #[test]
        fn prop_subtotal_is_sum_of_lines(
            items in prop::collection::vec((0i64..100_000, 1i64..=999), 0..20)
        ) {
            let cart = cart_of(&items);
            let totals = compute_totals(
                cart.lines(),
                &OrderAdjustments::default(),
                &CouponTable::empty(),
            ).unwrap();

            let expected: i64 = items.iter().map(|(p, q)| p * q).sum();
            prop_assert_eq!(totals.subtotal.cents(), expected);
            prop_assert_eq!(totals.amount_due, totals.subtotal);
        }

        #[test]
        fn prop_fixed_discount_within_subtotal(
            items in prop::collection::vec((1i64..100_000, 1i64..=50), 1..10),
            share in 0u32..=100
        ) {
            let cart = cart_of(&items);
            let subtotal: i64 = items.iter().map(|(p, q)| p * q).sum();
            let discount = subtotal * share as i64 / 100;
            let adjustments = OrderAdjustments {
                order_discount: Discount::Fixed(Money::from_cents(discount)),
                ..OrderAdjustments::default()
            };

            let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
            prop_assert_eq!(totals.amount_due.cents(), subtotal - discount);
        }

        #[test]
        fn prop_amount_due_never_negative(
            price in 0i64..10_000,
            discount in 0i64..1_000_000
        ) {
            let cart = cart_of(&[(price, 1)]);
            let adjustments = OrderAdjustments {
                order_discount: Discount::Fixed(Money::from_cents(discount)),
                ..OrderAdjustments::default()
            };

            let totals = compute_totals(cart.lines(), &adjustments, &CouponTable::empty()).unwrap();
            prop_assert!(!totals.amount_due.is_negative());
        }
    }
}
