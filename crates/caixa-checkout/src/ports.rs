//! # Collaborator Ports
//!
//! Everything the engine needs from the outside world, injected at
//! construction as trait objects.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CheckoutEngine                                 │
//! │                                                                         │
//! │   open_sale ─────────► CustomerDirectory   customer(id)                │
//! │   lookup_products ───► ProductCatalog      lookup(query, limit)        │
//! │   builder (once) ────► FeeProfileStore     profiles(company)           │
//! │   validate_payment ──► CashbackLedger      balance(customer)           │
//! │   commit_settlement ─► SaleIdGenerator     candidate()                 │
//! │                     ├► PersistenceStore    sale_exists, insert_*,      │
//! │                     │                      ensure_category             │
//! │                     └► ReceiptRenderer     render(record, lines)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`caixa_db::Database`] implements every data port (see `store.rs`).

use async_trait::async_trait;
use tracing::debug;

use caixa_core::{
    CartLine, Customer, FeeProfile, LedgerCategory, LedgerEntry, Money, Product, ProductLookup,
    SaleLine, SettlementRecord,
};

use crate::error::CollaboratorResult;

/// Catalog lookup by id, sku, barcode or name prefix.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn lookup(&self, query: &ProductLookup, limit: u32) -> CollaboratorResult<Vec<Product>>;
}

/// Customer directory.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Returns `Ok(None)` when no customer has `id`.
    async fn customer(&self, id: &str) -> CollaboratorResult<Option<Customer>>;
}

/// Read-only view of the cashback ledger.
#[async_trait]
pub trait CashbackLedger: Send + Sync {
    /// Current balance. Unknown customers are `NotFound`.
    async fn balance(&self, customer_id: &str) -> CollaboratorResult<Money>;
}

/// Card-terminal fee schedules per company.
#[async_trait]
pub trait FeeProfileStore: Send + Sync {
    async fn profiles(&self, company_id: &str) -> CollaboratorResult<Vec<FeeProfile>>;
}

/// Durable storage of committed sales.
///
/// `insert_sale_lines` and `insert_ledger_entries` are each all-or-nothing.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn sale_exists(&self, sale_id: &str) -> CollaboratorResult<bool>;

    async fn insert_sale_lines(&self, lines: &[SaleLine]) -> CollaboratorResult<()>;

    /// Create-if-absent; concurrent callers all get the same category.
    async fn ensure_category(&self, name: &str) -> CollaboratorResult<LedgerCategory>;

    async fn insert_ledger_entries(&self, entries: &[LedgerEntry]) -> CollaboratorResult<()>;
}

/// Receipt output (printer, WhatsApp share, e-mail).
///
/// Failures are logged by the engine and never fail the sale.
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    async fn render(&self, record: &SettlementRecord, lines: &[CartLine])
        -> CollaboratorResult<()>;
}

/// Produces sale identifier candidates. Uniqueness is checked by the engine.
pub trait SaleIdGenerator: Send + Sync {
    fn candidate(&self) -> String;
}

/// Renderer used when the terminal has no receipt output configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReceipt;

#[async_trait]
impl ReceiptRenderer for NoReceipt {
    async fn render(
        &self,
        record: &SettlementRecord,
        _lines: &[CartLine],
    ) -> CollaboratorResult<()> {
        debug!(sale_id = %record.sale_id, "No receipt renderer configured");
        Ok(())
    }
}
