//! # Error Types
//!
//! Domain-specific error types for caixa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caixa-core errors (this file)                                         │
//! │  ├── CoreError        - Cart and domain rule violations                │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── PaymentError     - Payment composition failures                   │
//! │       ├── validation    (recoverable, draft stays editable)            │
//! │       └── configuration (recoverable, option is hidden)                │
//! │                                                                         │
//! │  caixa-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  caixa-checkout errors (separate crate)                                │
//! │  └── CommitError      - Settlement commit failures                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart line cannot be found.
    #[error("Product {0} is not in the cart")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Nothing to settle.
    #[error("Cart is empty")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Payment error (wraps PaymentError).
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Payment snapshot could not be encoded.
    #[error("Failed to encode payment snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unknown card tier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Payment Error
// =============================================================================

/// Which recovery path a [`PaymentError`] calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentErrorKind {
    /// Operator fixes the input; the draft stays editable.
    Validation,
    /// The option is unusable on this terminal and should be hidden.
    Configuration,
}

/// Payment composition errors.
///
/// ## User Workflow
/// ```text
/// Operator picks "Cashback" for R$ 80,00 with R$ 50,00 typed in
///      │
///      ▼
/// validate_payment() → PartialRedemptionNotAllowed
///      │
///      ▼
/// UI: "Cashback alone must cover R$ 80,00; use a split payment"
///      │
///      ▼
/// Draft untouched, operator edits and retries
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Tendered amount does not cover what it must.
    #[error("Amount received {received} does not cover {required}")]
    InsufficientAmount { required: Money, received: Money },

    /// A required choice (card tier) was not made or is not offered.
    #[error("Select {what} before confirming")]
    MissingSelection { what: String },

    /// The method needs a customer bound to the sale.
    #[error("{method} requires a customer on the sale")]
    MissingCustomer { method: String },

    /// Crediário needs a first due date.
    #[error("Crediário requires a first due date")]
    MissingDate,

    /// Cashback redemption exceeds the customer's balance.
    #[error("Cashback balance {balance} is less than {requested}")]
    InsufficientBalance { balance: Money, requested: Money },

    /// Cashback as the only method must cover the whole amount due.
    #[error("Cashback alone must cover {amount_due} (got {requested}); use a split payment")]
    PartialRedemptionNotAllowed { amount_due: Money, requested: Money },

    /// Coupon code is unknown.
    #[error("Coupon '{code}' is not valid")]
    InvalidCoupon { code: String },

    /// A coupon leg asks for more than the coupon is worth.
    #[error("Coupon '{code}' is worth {value}, cannot settle {requested}")]
    CouponValueExceeded {
        code: String,
        value: Money,
        requested: Money,
    },

    /// The coupon was already applied to this sale.
    #[error("Coupon '{code}' was already used on this sale")]
    CouponAlreadyUsed { code: String },

    /// Split legs don't add up to the amount due.
    #[error("Split legs total {legs_total}, expected {amount_due}")]
    AmountMismatch { amount_due: Money, legs_total: Money },

    /// Both split legs redeem cashback.
    #[error("Only one split leg may redeem cashback")]
    DuplicateRedemption,

    /// Crediário installment count outside the allowed range.
    #[error("Crediário allows {min} to {max} installments (got {requested})")]
    InvalidInstallmentCount { requested: u8, min: u8, max: u8 },

    /// Crediário over a zero principal.
    #[error("Nothing to finance")]
    NothingToFinance,

    /// A plan that `validate_payment` could not have produced.
    #[error("Payment plan rejected: {reason}")]
    MalformedPlan { reason: String },

    /// Terminal has no configuration for this method.
    #[error("{what} is not configured on this terminal")]
    ConfigurationMissing { what: String },
}

impl PaymentError {
    /// Classifies the error for the UI's recovery path.
    pub fn kind(&self) -> PaymentErrorKind {
        match self {
            PaymentError::ConfigurationMissing { .. } => PaymentErrorKind::Configuration,
            _ => PaymentErrorKind::Validation,
        }
    }

    pub(crate) fn missing_customer(method: &str) -> Self {
        PaymentError::MissingCustomer {
            method: method.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        PaymentError::MalformedPlan {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_coupon(code: &str) -> Self {
        PaymentError::InvalidCoupon {
            code: code.to_string(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result of payment composition steps.
pub type PaymentResult<T> = Result<T, PaymentError>;

// =============================================================================
// Unit Tests
// =============================================================================
