//! # Validation Module
//!
//! Input validation utilities for Caixa POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Input (THIS MODULE)                                          │
//! │  ├── Quantities, prices, percentages, coupon codes                     │
//! │  └── Runs on every cart edit                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Payment composition (payment.rs)                             │
//! │  ├── Per-method preconditions                                          │
//! │  └── Split reconciliation                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (category name, sale line)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caixa_core::validation::{validate_quantity, validate_coupon_code};
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(validate_coupon_code(" desc10 ").unwrap(), "DESC10");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Discount, OrderAdjustments, Rate};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// 100% in basis points.
const FULL_RATE_BPS: u32 = 10_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Alphanumeric only; normalized to upper case
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon".to_string(),
        });
    }

    if code.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "coupon".to_string(),
            max: 20,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "coupon".to_string(),
            reason: "must contain only letters and numbers".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a non-negative monetary amount.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage in basis points (0% to 100%).
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate.bps() > FULL_RATE_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: FULL_RATE_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a line or order discount.
pub fn validate_discount(field: &str, discount: &Discount) -> ValidationResult<()> {
    match discount {
        Discount::None => Ok(()),
        Discount::Fixed(value) => validate_amount(field, *value),
        Discount::Percent(rate) => validate_rate(field, *rate),
    }
}

/// Validates order adjustments before they are attached to a draft.
pub fn validate_adjustments(adjustments: &OrderAdjustments) -> ValidationResult<()> {
    validate_discount("order discount", &adjustments.order_discount)?;
    validate_amount("surcharge", adjustments.surcharge)?;
    validate_amount("freight", adjustments.freight.amount)?;
    validate_rate("cashback rate", adjustments.cashback_earn_rate)?;

    if let Some(code) = &adjustments.coupon_code {
        validate_coupon_code(code)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Freight;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ARROZ-5KG").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert_eq!(validate_coupon_code("desc10").unwrap(), "DESC10");
        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("DESC-10").is_err());
        assert!(validate_coupon_code(&"X".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount("d", &Discount::Percent(Rate::from_percent(100))).is_ok());
        assert!(validate_discount("d", &Discount::Percent(Rate::from_bps(10_001))).is_err());
        assert!(validate_discount("d", &Discount::Fixed(Money::from_cents(-1))).is_err());
    }

    #[test]
    fn test_validate_adjustments() {
        let mut adjustments = OrderAdjustments {
            freight: Freight::charged_to_customer(Money::from_cents(1500)),
            coupon_code: Some("DESC10".to_string()),
            ..OrderAdjustments::default()
        };
        assert!(validate_adjustments(&adjustments).is_ok());

        adjustments.surcharge = Money::from_cents(-10);
        assert!(validate_adjustments(&adjustments).is_err());
    }
}
