//! # Domain Types
//!
//! Core domain types used throughout Caixa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │ OrderAdjustments│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id             │   │  order_discount │       │
//! │  │  sku / barcode  │   │  phone          │   │  surcharge      │       │
//! │  │  price_cents    │   │  cashback_cents │   │  freight, coupon│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    SaleLine     │   │  LedgerEntry    │   │  PaymentKind    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  one per cart   │   │  receivable     │   │  Cash, Card,    │       │
//! │  │  line, shared   │   │  Paid/Pending   │   │  Pix, Crediário │       │
//! │  │  sale_id        │   │  due_date       │   │  Cashback, Cupom│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Persisted Rows
//! `SaleLine` and `LedgerEntry` use plain `*_cents` columns (snapshot
//! pattern) so they map 1:1 onto the SQLite schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 299 bps = 2,99% (typical credit-card fee)
/// 1000 bps = 10% (order discount)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage (10 → 10%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product as returned by the product catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// How the operator asks the catalog for products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum ProductLookup {
    Id(String),
    Sku(String),
    Barcode(String),
    /// Case-insensitive name prefix.
    NamePrefix(String),
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record from the customer directory.
///
/// The cashback balance is a snapshot; the authoritative balance is read
/// from the cashback ledger at payment validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub cashback_balance_cents: i64,
}

impl Customer {
    /// Returns the cashback balance as Money.
    #[inline]
    pub fn cashback_balance(&self) -> Money {
        Money::from_cents(self.cashback_balance_cents)
    }
}

/// Read-only view of a customer's cashback account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashbackBalance {
    pub balance: Money,
}

// =============================================================================
// Adjustments
// =============================================================================

/// A discount applied to a cart line or to the whole order.
///
/// ## Semantics
/// - Line `Fixed(v)`: `v` off each unit (v × qty)
/// - Line `Percent(r)`: `r` of the line total
/// - Order `Fixed(v)`: literal `v`
/// - Order `Percent(r)`: `r` of (subtotal − item discounts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum Discount {
    #[default]
    None,
    Fixed(Money),
    Percent(Rate),
}

impl Discount {
    /// Checks whether this discount takes anything off.
    pub fn is_none(&self) -> bool {
        match self {
            Discount::None => true,
            Discount::Fixed(value) => value.is_zero(),
            Discount::Percent(rate) => rate.is_zero(),
        }
    }
}

/// Who pays for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FreightPayer {
    /// Store absorbs the freight; it never reaches the amount due.
    #[default]
    Store,
    /// Freight is charged to the customer.
    Customer,
}

/// Delivery charge and its payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Freight {
    pub amount: Money,
    pub payer: FreightPayer,
}

impl Freight {
    /// Freight charged to the customer.
    pub fn charged_to_customer(amount: Money) -> Self {
        Freight {
            amount,
            payer: FreightPayer::Customer,
        }
    }

    /// Portion of the freight that is added to the amount due.
    pub fn chargeable(&self) -> Money {
        match self.payer {
            FreightPayer::Customer => self.amount,
            FreightPayer::Store => Money::zero(),
        }
    }
}

/// Order-level adjustments applied on top of the cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderAdjustments {
    pub order_discount: Discount,
    pub surcharge: Money,
    pub freight: Freight,
    pub coupon_code: Option<String>,
    /// Company-configured cashback earn rate.
    pub cashback_earn_rate: Rate,
}

// =============================================================================
// Sale metadata
// =============================================================================

/// Where the sale happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SaleChannel {
    #[default]
    Counter,
    Delivery,
    Online,
}

/// How the customer wants the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReceiptPreference {
    #[default]
    None,
    Print,
    Whatsapp,
    Email,
}

/// Operator-supplied metadata captured at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleMeta {
    pub seller: String,
    pub channel: SaleChannel,
    pub receipt: ReceiptPreference,
    pub notes: Option<String>,
}

impl SaleMeta {
    /// Counter sale with no receipt.
    pub fn counter(seller: impl Into<String>) -> Self {
        SaleMeta {
            seller: seller.into(),
            channel: SaleChannel::Counter,
            receipt: ReceiptPreference::None,
            notes: None,
        }
    }
}

// =============================================================================
// Payment Kind
// =============================================================================

/// Payment instrument tag, as persisted on ledger entries.
///
/// The payload-carrying variant lives in [`crate::payment::PaymentMethod`];
/// this is its storage discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentKind {
    Cash,
    Card,
    Pix,
    StoreCredit,
    CashbackRedeem,
    Coupon,
}

impl PaymentKind {
    /// Whether this instrument settles at the counter.
    pub const fn settles_immediately(&self) -> bool {
        !matches!(self, PaymentKind::StoreCredit)
    }

    /// Human-readable label for ledger descriptions.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentKind::Cash => "Dinheiro",
            PaymentKind::Card => "Cartão",
            PaymentKind::Pix => "Pix",
            PaymentKind::StoreCredit => "Crediário",
            PaymentKind::CashbackRedeem => "Cashback",
            PaymentKind::Coupon => "Cupom",
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Settlement status of a receivable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LedgerStatus {
    /// Settled at the counter.
    Paid,
    /// Crediário installment awaiting payment.
    Pending,
}

/// Name of the ledger category every sale receivable is filed under.
pub const SALES_CATEGORY: &str = "Vendas";

/// A ledger category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerCategory {
    pub id: String,
    pub name: String,
}

/// A receivable derived from a settled sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub sale_id: String,
    pub category_id: String,
    pub description: String,
    pub method: PaymentKind,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: LedgerStatus,
    /// 1-based installment sequence for crediário receivables.
    pub installment_number: Option<i64>,
    pub installment_count: Option<i64>,
    pub customer_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the entry amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One persisted row per cart line. All rows of a sale share `sale_id`
/// and carry the sale-level totals (snapshot pattern).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub line_number: i64,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_discount_cents: i64,
    /// unit_price × quantity − line discount.
    pub line_total_cents: i64,
    pub subtotal_cents: i64,
    pub item_discount_cents: i64,
    pub order_discount_cents: i64,
    pub surcharge_cents: i64,
    pub freight_cents: i64,
    pub amount_due_cents: i64,
    /// JSON snapshot of the settled payment legs.
    pub payment_snapshot: String,
    pub customer_id: Option<String>,
    pub seller: String,
    pub channel: SaleChannel,
    pub receipt_preference: ReceiptPreference,
    pub coupon_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
