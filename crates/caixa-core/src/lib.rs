//! # caixa-core: Pure Business Logic for Caixa POS
//!
//! Totals, payment composition, crediário schedules and settlement, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caixa POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 caixa-checkout (Orchestration)                  │   │
//! │  │    open_sale ──► compute_totals ──► validate ──► commit        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caixa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │  totals   │  │  payment  │  │ crediario │  │   │
//! │  │   │ CartLine  │  │  Totals   │  │   Plan    │  │ Schedule  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   fees    │  │settlement │  │   money   │  │ validation│  │   │
//! │  │   │ CardTier  │  │  Record   │  │   Money   │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caixa-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, SaleLine, LedgerEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart lines and edits
//! - [`totals`] - Totals cascade and coupon table
//! - [`fees`] - Card tiers and fee profiles
//! - [`payment`] - Payment plans and the leg validator
//! - [`crediario`] - Installment schedule generation
//! - [`settlement`] - Sale rows, ledger entries, settlement record
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use caixa_core::money::Money;
//! use caixa_core::payment::{validate_payment, PaymentContext, PaymentPlan};
//! use caixa_core::totals::CouponTable;
//!
//! let coupons = CouponTable::default();
//! let ctx = PaymentContext::new(Money::from_cents(7350), &coupons);
//!
//! // Customer hands over R$ 100,00 for R$ 73,50
//! let plan = validate_payment(&PaymentPlan::cash(Money::from_cents(10000)), &ctx).unwrap();
//! assert_eq!(plan.change().cents(), 2650);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod crediario;
pub mod error;
pub mod fees;
pub mod money;
pub mod payment;
pub mod settlement;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine};
pub use error::{CoreError, PaymentError, PaymentErrorKind, ValidationError};
pub use fees::{CardTier, FeeProfile, TierQuote};
pub use money::Money;
pub use payment::{PaymentContext, PaymentLeg, PaymentMethod, PaymentPlan, ValidatedPlan};
pub use settlement::{Settlement, SettlementRecord};
pub use totals::{CouponTable, Totals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
