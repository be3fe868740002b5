//! # Sale Draft
//!
//! The sale being assembled on a terminal, from open to commit.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open_sale ──► Open ──────────────► LedgerPending ─────► Committed    │
//! │                 │  cart edits,        sale rows stored,    read only   │
//! │                 │  adjustments,       ledger insert        (commit =   │
//! │                 │  fee profile        failed; retry only   Already-    │
//! │                 │                     the ledger step      Committed)  │
//! │                 │                          │                   ▲       │
//! │                 │  commit ok ──────────────┼───────────────────┘       │
//! │                 ▼                          └── retry ok ───────┘       │
//! │              dropped = cancelled (nothing was written)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! [`SaleHandle`] wraps the draft in `Arc<tokio::sync::Mutex<_>>`. The commit
//! holds the lock across its awaits, so a second commit of the same draft
//! waits for the first to resolve.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use caixa_core::types::Rate;
use caixa_core::validation::validate_adjustments;
use caixa_core::{
    Cart, Customer, Discount, FeeProfile, LedgerEntry, OrderAdjustments, Product, SettlementRecord,
};

use crate::error::{CheckoutError, CheckoutResult};

/// Where the draft stands relative to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftState {
    /// Editable; nothing written yet.
    Open,

    /// Sale rows committed; these ledger entries still need writing.
    LedgerPending {
        record: SettlementRecord,
        entries: Vec<LedgerEntry>,
    },

    /// Fully written.
    Committed { record: SettlementRecord },
}

/// One sale under construction.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    id: Uuid,
    cart: Cart,
    adjustments: OrderAdjustments,
    customer: Option<Customer>,
    fee_profile: Option<FeeProfile>,
    state: DraftState,
    opened_at: DateTime<Utc>,
}

impl SaleDraft {
    /// New open draft. The customer binding is fixed for the draft's life.
    pub fn new(customer: Option<Customer>, cashback_earn_rate: Rate) -> Self {
        SaleDraft {
            id: Uuid::new_v4(),
            cart: Cart::new(),
            adjustments: OrderAdjustments {
                cashback_earn_rate,
                ..OrderAdjustments::default()
            },
            customer,
            fee_profile: None,
            state: DraftState::Open,
            opened_at: Utc::now(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn adjustments(&self) -> &OrderAdjustments {
        &self.adjustments
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn fee_profile(&self) -> Option<&FeeProfile> {
        self.fee_profile.as_ref()
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DraftState::Open)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.state, DraftState::Committed { .. })
    }

    /// Sale id once the sale rows reached storage.
    pub fn sale_id(&self) -> Option<&str> {
        match &self.state {
            DraftState::Open => None,
            DraftState::LedgerPending { record, .. } | DraftState::Committed { record } => {
                Some(&record.sale_id)
            }
        }
    }

    /// Ledger entries still waiting for a retry.
    pub fn pending_ledger(&self) -> &[LedgerEntry] {
        match &self.state {
            DraftState::LedgerPending { entries, .. } => entries,
            _ => &[],
        }
    }

    // =========================================================================
    // Edits (Open only)
    // =========================================================================

    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CheckoutResult<()> {
        self.ensure_open()?;
        self.cart.add_product(product, quantity)?;
        debug!(draft = %self.id, product_id = %product.id, quantity, "Line added");
        Ok(())
    }

    /// A quantity of 0 removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CheckoutResult<()> {
        self.ensure_open()?;
        self.cart.update_quantity(product_id, quantity)?;
        Ok(())
    }

    pub fn set_line_discount(&mut self, product_id: &str, discount: Discount) -> CheckoutResult<()> {
        self.ensure_open()?;
        self.cart.set_line_discount(product_id, discount)?;
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: &str) -> CheckoutResult<()> {
        self.ensure_open()?;
        self.cart.remove_line(product_id)?;
        Ok(())
    }

    pub fn clear_cart(&mut self) -> CheckoutResult<()> {
        self.ensure_open()?;
        self.cart.clear();
        Ok(())
    }

    /// Replaces the order adjustments.
    ///
    /// The cashback earn rate comes from company config and is kept.
    pub fn set_adjustments(&mut self, adjustments: OrderAdjustments) -> CheckoutResult<()> {
        self.ensure_open()?;
        let adjustments = OrderAdjustments {
            cashback_earn_rate: self.adjustments.cashback_earn_rate,
            ..adjustments
        };
        validate_adjustments(&adjustments)?;
        self.adjustments = adjustments;
        Ok(())
    }

    /// Binds the card machine for this sale.
    ///
    /// Re-selecting the same profile is a no-op; a different one is rejected.
    pub fn lock_fee_profile(&mut self, profile: FeeProfile) -> CheckoutResult<()> {
        self.ensure_open()?;
        match &self.fee_profile {
            Some(locked) if locked.name == profile.name => Ok(()),
            Some(locked) => Err(CheckoutError::FeeProfileLocked {
                locked: locked.name.clone(),
            }),
            None => {
                info!(draft = %self.id, profile = %profile.name, "Fee profile locked");
                self.fee_profile = Some(profile);
                Ok(())
            }
        }
    }

    pub(crate) fn ensure_open(&self) -> CheckoutResult<()> {
        match self.sale_id() {
            None => Ok(()),
            Some(sale_id) => Err(CheckoutError::DraftClosed {
                sale_id: sale_id.to_string(),
            }),
        }
    }

    pub(crate) fn set_state(&mut self, state: DraftState) {
        self.state = state;
    }
}

// =============================================================================
// Sale Handle
// =============================================================================

/// Shared handle to a draft.
#[derive(Debug, Clone)]
pub struct SaleHandle {
    draft: Arc<Mutex<SaleDraft>>,
}

impl SaleHandle {
    pub fn new(draft: SaleDraft) -> Self {
        SaleHandle {
            draft: Arc::new(Mutex::new(draft)),
        }
    }

    /// Exclusive access, held until the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, SaleDraft> {
        self.draft.lock().await
    }

    /// Runs `f` with read access to the draft.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let lines = sale.with_draft(|d| d.cart().item_count()).await;
    /// ```
    pub async fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SaleDraft) -> R,
    {
        let draft = self.draft.lock().await;
        f(&draft)
    }

    /// Runs `f` with write access to the draft.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// sale.with_draft_mut(|d| d.add_product(&product, 2)).await?;
    /// ```
    pub async fn with_draft_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SaleDraft) -> R,
    {
        let mut draft = self.draft.lock().await;
        f(&mut draft)
    }
}
