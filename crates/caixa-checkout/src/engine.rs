//! # Checkout Engine
//!
//! Drives a sale from open to commit against the injected collaborators.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_settlement(sale, plan, totals, meta)     [draft lock held]     │
//! │                                                                         │
//! │  1. state check ── Committed ──► AlreadyCommitted                      │
//! │                 └─ LedgerPending ──► jump to 6                         │
//! │  2. plan.amount_due == totals == fresh totals, else StalePlan          │
//! │     legs re-checked against the draft, else PlanRejected               │
//! │  3. sale id: candidate ─► sale_exists? ─► retry (N) ─► Exhausted       │
//! │  4. ensure_category("Vendas")                                          │
//! │  5. compose_settlement ─► insert_sale_lines (atomic)                   │
//! │        failure: PersistenceFailure, draft still Open                   │
//! │  6. insert_ledger_entries (atomic)                                     │
//! │        failure: PartialCommitFailure, entries kept on the draft        │
//! │  7. Committed ─► receipt renderer (failure only logged)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Initialization Barrier
//! [`CheckoutEngineBuilder::build`] loads the company's fee profiles before
//! the engine exists, so every engine method sees a complete fee schedule.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, info, warn};

use caixa_core::fees::quote_tiers;
use caixa_core::payment::validate_payment as validate_plan;
use caixa_core::settlement::{compose_settlement, SettlementRequest};
use caixa_core::totals::compute_totals;
use caixa_core::validation::{validate_sku, validate_search_query};
use caixa_core::{
    CouponTable, FeeProfile, PaymentContext, PaymentError, PaymentKind, PaymentPlan, Product,
    ProductLookup, SaleMeta, SettlementRecord, TierQuote, Totals, ValidatedPlan, ValidationError,
    SALES_CATEGORY,
};
use caixa_db::Database;

use crate::config::CheckoutConfig;
use crate::draft::{DraftState, SaleDraft, SaleHandle};
use crate::error::{CheckoutError, CheckoutResult, CommitError};
use crate::ids::DateSuffixIds;
use crate::ports::{
    CashbackLedger, CustomerDirectory, FeeProfileStore, NoReceipt, PersistenceStore,
    ProductCatalog, ReceiptRenderer, SaleIdGenerator,
};

/// Largest result set a catalog lookup may return.
pub const MAX_LOOKUP_RESULTS: u32 = 100;

// =============================================================================
// Engine
// =============================================================================

/// Sale finalization engine for one terminal.
pub struct CheckoutEngine {
    config: Arc<CheckoutConfig>,
    coupons: CouponTable,
    fee_profiles: BTreeMap<String, FeeProfile>,
    catalog: Arc<dyn ProductCatalog>,
    customers: Arc<dyn CustomerDirectory>,
    cashback: Arc<dyn CashbackLedger>,
    store: Arc<dyn PersistenceStore>,
    renderer: Arc<dyn ReceiptRenderer>,
    ids: Arc<dyn SaleIdGenerator>,
}

impl CheckoutEngine {
    pub fn builder(config: CheckoutConfig) -> CheckoutEngineBuilder {
        CheckoutEngineBuilder::new(config)
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn coupons(&self) -> &CouponTable {
        &self.coupons
    }

    /// Commit metadata prefilled with the terminal's configured channel and
    /// receipt preference.
    pub fn default_meta(&self, seller: impl Into<String>) -> SaleMeta {
        SaleMeta {
            seller: seller.into(),
            channel: self.config.sale.default_channel,
            receipt: self.config.sale.default_receipt,
            notes: None,
        }
    }

    /// Names of the fee profiles loaded at startup.
    pub fn fee_profile_names(&self) -> impl Iterator<Item = &str> {
        self.fee_profiles.keys().map(String::as_str)
    }

    // =========================================================================
    // Sale setup
    // =========================================================================

    /// Opens a new draft, binding the customer for the sale's whole life.
    ///
    /// ## Errors
    /// - `UnknownCustomer` if `customer_id` is not in the directory
    pub async fn open_sale(&self, customer_id: Option<&str>) -> CheckoutResult<SaleHandle> {
        let customer = match customer_id {
            Some(id) => Some(
                self.customers
                    .customer(id)
                    .await?
                    .ok_or_else(|| CheckoutError::UnknownCustomer(id.to_string()))?,
            ),
            None => None,
        };

        let draft = SaleDraft::new(customer, self.config.cashback_earn_rate());
        info!(
            draft = %draft.id(),
            customer_id = ?customer_id,
            terminal = %self.config.store.terminal_id,
            "Sale opened"
        );

        Ok(SaleHandle::new(draft))
    }

    /// Catalog lookup. `limit` is clamped to 1..=100.
    pub async fn lookup_products(
        &self,
        query: &ProductLookup,
        limit: u32,
    ) -> CheckoutResult<Vec<Product>> {
        let query = match query {
            ProductLookup::Sku(sku) => {
                validate_sku(sku)?;
                ProductLookup::Sku(sku.trim().to_string())
            }
            ProductLookup::NamePrefix(prefix) => {
                ProductLookup::NamePrefix(validate_search_query(prefix)?)
            }
            ProductLookup::Id(value) | ProductLookup::Barcode(value) if value.trim().is_empty() => {
                return Err(ValidationError::Required {
                    field: "lookup".to_string(),
                }
                .into());
            }
            other => other.clone(),
        };

        let limit = limit.clamp(1, MAX_LOOKUP_RESULTS);
        let products = self.catalog.lookup(&query, limit).await?;

        debug!(?query, count = products.len(), "Products looked up");
        Ok(products)
    }

    /// Binds a card machine to the sale. The first choice sticks.
    pub async fn select_fee_profile(&self, sale: &SaleHandle, name: &str) -> CheckoutResult<()> {
        let profile = self
            .fee_profiles
            .get(name)
            .cloned()
            .ok_or_else(|| CheckoutError::UnknownFeeProfile(name.to_string()))?;

        sale.with_draft_mut(|draft| draft.lock_fee_profile(profile))
            .await
    }

    /// Card tiers the sale's machine offers, quoted for the current amount due.
    ///
    /// ## Errors
    /// - `ConfigurationMissing` when no fee profile is bound (hide the card option)
    pub async fn offered_card_tiers(&self, sale: &SaleHandle) -> CheckoutResult<Vec<TierQuote>> {
        let draft = sale.lock().await;
        let profile = draft
            .fee_profile()
            .ok_or_else(|| PaymentError::ConfigurationMissing {
                what: "fee profile".to_string(),
            })?;

        let totals = self.totals_for(&draft)?;
        Ok(quote_tiers(profile, totals.amount_due))
    }

    // =========================================================================
    // Totals & payment
    // =========================================================================

    /// Totals of the draft as it stands now.
    pub async fn compute_totals(&self, sale: &SaleHandle) -> CheckoutResult<Totals> {
        let draft = sale.lock().await;
        self.totals_for(&draft)
    }

    fn totals_for(&self, draft: &SaleDraft) -> CheckoutResult<Totals> {
        Ok(compute_totals(
            draft.cart().lines(),
            draft.adjustments(),
            &self.coupons,
        )?)
    }

    /// Validates a payment plan against the draft's current amount due.
    ///
    /// The cashback balance is read fresh when the plan redeems cashback.
    pub async fn validate_payment(
        &self,
        sale: &SaleHandle,
        plan: &PaymentPlan,
    ) -> CheckoutResult<ValidatedPlan> {
        let draft = sale.lock().await;
        draft.ensure_open()?;

        let totals = self.totals_for(&draft)?;

        let balance = match draft.customer() {
            Some(customer) if redeems_cashback(plan) => {
                Some(self.cashback.balance(&customer.id).await?)
            }
            _ => None,
        };

        let ctx = PaymentContext::new(totals.amount_due, &self.coupons)
            .with_customer(draft.customer())
            .with_cashback_balance(balance)
            .with_fee_profile(draft.fee_profile())
            .with_applied_coupon(totals.coupon_code.as_deref());

        let validated = validate_plan(plan, &ctx)?;

        debug!(
            draft = %draft.id(),
            amount_due = %validated.amount_due,
            legs = validated.legs.len(),
            "Payment plan validated"
        );
        Ok(validated)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commits the sale: sale rows, then ledger entries, then the receipt.
    ///
    /// Holds the draft lock for the whole call. On a draft whose ledger step
    /// failed earlier, only the ledger step runs again.
    pub async fn commit_settlement(
        &self,
        sale: &SaleHandle,
        plan: &ValidatedPlan,
        totals: &Totals,
        meta: &SaleMeta,
    ) -> Result<SettlementRecord, CommitError> {
        let mut draft = sale.lock().await;

        let ledger_pending = match draft.state() {
            DraftState::Committed { record } => {
                return Err(CommitError::AlreadyCommitted {
                    sale_id: record.sale_id.clone(),
                })
            }
            DraftState::LedgerPending { .. } => true,
            DraftState::Open => false,
        };
        if ledger_pending {
            return self.flush_ledger(&mut draft).await;
        }

        let current = compute_totals(draft.cart().lines(), draft.adjustments(), &self.coupons)
            .map_err(caixa_core::CoreError::from)?;
        for amount in [totals.amount_due, current.amount_due] {
            if plan.amount_due != amount {
                return Err(CommitError::StalePlan {
                    validated: plan.amount_due,
                    current: amount,
                });
            }
        }

        plan.verify(current.amount_due, draft.customer().map(|c| c.id.as_str()))
            .map_err(CommitError::PlanRejected)?;

        let sale_id = self.assign_sale_id().await?;
        let category = self
            .store
            .ensure_category(SALES_CATEGORY)
            .await
            .map_err(CommitError::PersistenceFailure)?;

        let settlement = compose_settlement(SettlementRequest {
            sale_id: &sale_id,
            category_id: &category.id,
            plan,
            totals: &current,
            lines: draft.cart().lines(),
            meta,
            today: Local::now().date_naive(),
            now: Utc::now(),
        })?;

        self.store
            .insert_sale_lines(&settlement.sale_lines)
            .await
            .map_err(CommitError::PersistenceFailure)?;

        info!(
            sale_id = %sale_id,
            amount_due = %current.amount_due,
            lines = settlement.sale_lines.len(),
            "Sale rows committed"
        );

        draft.set_state(DraftState::LedgerPending {
            record: settlement.record,
            entries: settlement.ledger_entries,
        });

        self.flush_ledger(&mut draft).await
    }

    /// Retries the ledger step of a partially committed sale.
    pub async fn retry_ledger(&self, sale: &SaleHandle) -> Result<SettlementRecord, CommitError> {
        let mut draft = sale.lock().await;
        match draft.state() {
            DraftState::LedgerPending { .. } => {}
            DraftState::Committed { record } => {
                return Err(CommitError::AlreadyCommitted {
                    sale_id: record.sale_id.clone(),
                })
            }
            DraftState::Open => return Err(CommitError::NothingToRetry),
        }
        self.flush_ledger(&mut draft).await
    }

    async fn flush_ledger(&self, draft: &mut SaleDraft) -> Result<SettlementRecord, CommitError> {
        let (record, entries) = match draft.state() {
            DraftState::LedgerPending { record, entries } => (record.clone(), entries.clone()),
            _ => return Err(CommitError::NothingToRetry),
        };

        if let Err(source) = self.store.insert_ledger_entries(&entries).await {
            warn!(
                sale_id = %record.sale_id,
                entries = entries.len(),
                error = %source,
                "Ledger insert failed, entries kept for retry"
            );
            return Err(CommitError::PartialCommitFailure {
                sale_id: record.sale_id,
                source,
            });
        }

        info!(sale_id = %record.sale_id, entries = entries.len(), "Sale committed");
        draft.set_state(DraftState::Committed {
            record: record.clone(),
        });

        if let Err(e) = self.renderer.render(&record, draft.cart().lines()).await {
            warn!(sale_id = %record.sale_id, error = %e, "Receipt rendering failed");
        }

        Ok(record)
    }

    /// Finds a sale id not yet in storage.
    async fn assign_sale_id(&self) -> Result<String, CommitError> {
        let attempts = self.config.sale.sale_id_attempts;

        for attempt in 1..=attempts {
            let candidate = self.ids.candidate();
            let taken = self
                .store
                .sale_exists(&candidate)
                .await
                .map_err(CommitError::PersistenceFailure)?;

            if !taken {
                return Ok(candidate);
            }
            debug!(candidate = %candidate, attempt, "Sale id collision");
        }

        warn!(attempts, "Sale id attempts exhausted");
        Err(CommitError::IdentifierExhausted { attempts })
    }
}

fn redeems_cashback(plan: &PaymentPlan) -> bool {
    match plan {
        PaymentPlan::Single { method, .. } => method.kind() == PaymentKind::CashbackRedeem,
        PaymentPlan::Split { first, second } => [first, second]
            .iter()
            .any(|leg| leg.method.kind() == PaymentKind::CashbackRedeem),
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`CheckoutEngine`].
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(config.db_config()).await?;
/// let engine = CheckoutEngine::builder(config)
///     .with_database(db)
///     .with_renderer(Arc::new(ThermalPrinter::new()))
///     .build()
///     .await?;
/// ```
pub struct CheckoutEngineBuilder {
    config: CheckoutConfig,
    catalog: Option<Arc<dyn ProductCatalog>>,
    customers: Option<Arc<dyn CustomerDirectory>>,
    cashback: Option<Arc<dyn CashbackLedger>>,
    fee_profiles: Option<Arc<dyn FeeProfileStore>>,
    store: Option<Arc<dyn PersistenceStore>>,
    renderer: Option<Arc<dyn ReceiptRenderer>>,
    ids: Option<Arc<dyn SaleIdGenerator>>,
}

impl CheckoutEngineBuilder {
    pub fn new(config: CheckoutConfig) -> Self {
        CheckoutEngineBuilder {
            config,
            catalog: None,
            customers: None,
            cashback: None,
            fee_profiles: None,
            store: None,
            renderer: None,
            ids: None,
        }
    }

    /// Uses one SQLite database for every data collaborator.
    pub fn with_database(self, db: Database) -> Self {
        let db = Arc::new(db);
        self.with_catalog(db.clone() as Arc<dyn ProductCatalog>)
            .with_customers(db.clone() as Arc<dyn CustomerDirectory>)
            .with_cashback(db.clone() as Arc<dyn CashbackLedger>)
            .with_fee_profiles(db.clone() as Arc<dyn FeeProfileStore>)
            .with_store(db as Arc<dyn PersistenceStore>)
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_customers(mut self, customers: Arc<dyn CustomerDirectory>) -> Self {
        self.customers = Some(customers);
        self
    }

    pub fn with_cashback(mut self, cashback: Arc<dyn CashbackLedger>) -> Self {
        self.cashback = Some(cashback);
        self
    }

    pub fn with_fee_profiles(mut self, fee_profiles: Arc<dyn FeeProfileStore>) -> Self {
        self.fee_profiles = Some(fee_profiles);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn SaleIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validates config, loads fee profiles, and builds the engine.
    pub async fn build(self) -> CheckoutResult<CheckoutEngine> {
        self.config
            .validate()
            .map_err(|e| CheckoutError::Setup(e.to_string()))?;

        let catalog = self.catalog.ok_or_else(|| missing("product catalog"))?;
        let customers = self.customers.ok_or_else(|| missing("customer directory"))?;
        let cashback = self.cashback.ok_or_else(|| missing("cashback ledger"))?;
        let fee_store = self.fee_profiles.ok_or_else(|| missing("fee profile store"))?;
        let store = self.store.ok_or_else(|| missing("persistence store"))?;
        let renderer = self.renderer.unwrap_or_else(|| Arc::new(NoReceipt));
        let ids = self.ids.unwrap_or_else(|| Arc::new(DateSuffixIds));

        let company_id = self.config.company_id().to_string();
        let fee_profiles: BTreeMap<String, FeeProfile> = fee_store
            .profiles(&company_id)
            .await?
            .into_iter()
            .map(|profile| (profile.name.clone(), profile))
            .collect();

        if fee_profiles.is_empty() {
            warn!(company_id = %company_id, "No fee profiles configured, card payments disabled");
        }

        info!(
            company_id = %company_id,
            fee_profiles = fee_profiles.len(),
            coupons = self.config.coupons.len(),
            "Checkout engine ready"
        );

        Ok(CheckoutEngine {
            coupons: self.config.coupon_table(),
            config: Arc::new(self.config),
            fee_profiles,
            catalog,
            customers,
            cashback,
            store,
            renderer,
            ids,
        })
    }
}

fn missing(what: &str) -> CheckoutError {
    CheckoutError::Setup(format!("{} not provided", what))
}
