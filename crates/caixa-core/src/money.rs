//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Crediário of R$ 100,00 in 3x:                                          │
//! │    100.00 / 3 = 33.333... (×3 = 99.99) → Lost R$ 0,01!                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 cents / 3 = 3333 cents, remainder 1                           │
//! │    The remainder is assigned explicitly (see `split_even`)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caixa_core::money::Money;
//!
//! let price = Money::from_cents(1099); // R$ 10,99
//! let doubled = price * 2;             // R$ 21,98
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

/// Tolerance used when reconciling split payments against the amount due.
pub const RECONCILIATION_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: Intermediate results (discounts larger than the
///   subtotal) may go negative before clamping
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// CartLine.unit_price ──► line_total ──► Totals.subtotal ──► amount_due
///                                                               │
///              PaymentLeg.amount ◄── Split reconciliation ◄─────┤
///                                                               │
///           InstallmentReceivable.amount ◄── Crediário split ◄──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::money::Money;
    ///
    /// let price = Money::from_cents(7350); // R$ 73,50
    /// assert_eq!(price.cents(), 7350);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (reais and centavos).
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(26, 50).cents(), 2650);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (reais) portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Subtotal R$ 20,00 − coupon R$ 30,00 = −R$ 10,00
    ///      │
    ///      ▼
    /// clamp_non_negative() ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Amount due: R$ 0,00
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Returns the smaller of two values.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Calculates `rate` of this amount, rounding half away from zero.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides
    /// rounding (5000/10000 = 0.5). i128 prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::money::Money;
    /// use caixa_core::types::Rate;
    ///
    /// let amount = Money::from_cents(10000);  // R$ 100,00
    /// let fee = amount.percent_of(Rate::from_bps(299)); // 2,99%
    /// assert_eq!(fee.cents(), 299);
    /// ```
    pub fn percent_of(&self, rate: Rate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Splits the amount into `parts` equal shares floored to the cent.
    ///
    /// Returns `(base, remainder)` where `base * parts + remainder == self`
    /// and `0 <= remainder < parts` cents. Callers decide who absorbs the
    /// remainder.
    ///
    /// ## Example
    /// ```rust
    /// use caixa_core::money::Money;
    ///
    /// let (base, rest) = Money::from_cents(10000).split_even(3);
    /// assert_eq!(base.cents(), 3333);
    /// assert_eq!(rest.cents(), 1);
    /// ```
    pub fn split_even(&self, parts: u32) -> (Money, Money) {
        if parts == 0 {
            return (Money::zero(), *self);
        }
        let parts = parts as i64;
        let base = self.0.div_euclid(parts);
        let remainder = self.0 - base * parts;
        (Money(base), Money(remainder))
    }

    /// Checks whether two amounts agree within `tolerance`.
    #[inline]
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money in Brazilian notation (`R$ 1234,56`).
///
/// ## Note
/// This is for logs and debugging. Receipt formatting is owned by the
/// receipt renderer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R$ {},{:02}", sign, self.reais().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(73, 50).cents(), 7350);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "R$ 10,99");
        assert_eq!(format!("{}", Money::from_cents(500)), "R$ 5,00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-R$ 5,50");
        assert_eq!(format!("{}", Money::zero()), "R$ 0,00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // R$ 10,00 at 8,25% = R$ 0,825 → R$ 0,83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percent_of(Rate::from_bps(825)).cents(), 83);

        // R$ 80,00 at 10% = R$ 8,00
        assert_eq!(
            Money::from_cents(8000).percent_of(Rate::from_bps(1000)).cents(),
            800
        );
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-1000).clamp_non_negative(), Money::zero());
        assert_eq!(
            Money::from_cents(250).clamp_non_negative(),
            Money::from_cents(250)
        );
    }

    #[test]
    fn test_split_even_reconciles() {
        let principal = Money::from_cents(10000);
        let (base, rest) = principal.split_even(3);
        assert_eq!(base.cents(), 3333);
        assert_eq!(rest.cents(), 1);
        assert_eq!(base * 3 + rest, principal);

        let (base, rest) = Money::from_cents(12000).split_even(4);
        assert_eq!(base.cents(), 3000);
        assert!(rest.is_zero());
    }

    #[test]
    fn test_within_tolerance() {
        let due = Money::from_cents(10000);
        assert!(Money::from_cents(9999).within(due, RECONCILIATION_TOLERANCE));
        assert!(Money::from_cents(10001).within(due, RECONCILIATION_TOLERANCE));
        assert!(!Money::from_cents(9900).within(due, RECONCILIATION_TOLERANCE));
    }
}
