//! # caixa-checkout: Sale Finalization Engine for Caixa POS
//!
//! Turns a cart into a committed sale: totals, payment validation across one
//! or two legs, crediário schedule, sale rows and ledger receivables.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open_sale(customer) ──► SaleHandle (Arc<Mutex<SaleDraft>>)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lookup_products ─► draft.add_product / set_adjustments                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  select_fee_profile ─► offered_card_tiers (fees shown, never charged)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_totals ─► validate_payment(plan) ─► ValidatedPlan             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit_settlement ─► SettlementRecord                                 │
//! │       │    PartialCommitFailure                                        │
//! │       └──────────────────────► retry_ledger                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `CheckoutConfig` (TOML + `CAIXA_*` env)
//! - [`draft`] - `SaleDraft` and its shared `SaleHandle`
//! - [`engine`] - `CheckoutEngine` and its builder
//! - [`error`] - Commit, checkout, collaborator and config errors
//! - [`ids`] - Default sale id generator
//! - [`ports`] - Collaborator traits
//! - `store` - SQLite implementations of the data ports

pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod ids;
pub mod ports;
mod store;

#[cfg(test)]
mod testing;

pub use config::{CardFeePayer, CheckoutConfig};
pub use draft::{DraftState, SaleDraft, SaleHandle};
pub use engine::{CheckoutEngine, CheckoutEngineBuilder};
pub use error::{CheckoutError, CollaboratorError, CommitError, ConfigError};
pub use ids::DateSuffixIds;
pub use ports::{
    CashbackLedger, CustomerDirectory, FeeProfileStore, NoReceipt, PersistenceStore,
    ProductCatalog, ReceiptRenderer, SaleIdGenerator,
};

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,caixa=debug,sqlx=warn";

/// Installs the global `tracing` subscriber for a terminal process.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
