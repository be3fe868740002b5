//! In-memory collaborators for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use caixa_core::types::Rate;
use caixa_core::{
    CardTier, CartLine, Customer, FeeProfile, LedgerCategory, LedgerEntry, Money, Product,
    ProductLookup, SaleLine, SettlementRecord,
};

use crate::config::CheckoutConfig;
use crate::engine::CheckoutEngine;
use crate::error::{CollaboratorError, CollaboratorResult};
use crate::ports::{
    CashbackLedger, CustomerDirectory, FeeProfileStore, PersistenceStore, ProductCatalog,
    ReceiptRenderer, SaleIdGenerator,
};

pub(crate) fn product(id: &str, price_cents: i64) -> Product {
    Product {
        id: id.to_string(),
        sku: format!("SKU-{}", id),
        barcode: None,
        name: format!("Produto {}", id),
        price_cents,
    }
}

pub(crate) fn stone() -> FeeProfile {
    FeeProfile::new("Stone")
        .with_rate(CardTier::Debit, Rate::from_bps(199))
        .with_rate(CardTier::Credit(1), Rate::from_bps(319))
        .with_rate(CardTier::Credit(2), Rate::from_bps(459))
        .with_rate(CardTier::Credit(3), Rate::from_bps(529))
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    products: Vec<Product>,
    customers: Mutex<HashMap<String, Customer>>,
    profiles: Vec<FeeProfile>,
    pub sale_lines: Mutex<Vec<SaleLine>>,
    pub ledger: Mutex<Vec<LedgerEntry>>,
    pub categories: Mutex<Vec<LedgerCategory>>,
    pub taken_ids: Mutex<HashSet<String>>,
    pub fail_ledger: AtomicBool,
    pub ledger_attempts: AtomicUsize,
}

impl MemoryStore {
    /// Two products, customer `c-1` with R$ 100,00 of cashback, "Stone" machine.
    pub fn seeded() -> Arc<Self> {
        let maria = Customer {
            id: "c-1".to_string(),
            name: "Maria Souza".to_string(),
            phone: None,
            cashback_balance_cents: 10_000,
        };
        Arc::new(MemoryStore {
            products: vec![product("p1", 2500), product("p2", 899)],
            customers: Mutex::new(HashMap::from([(maria.id.clone(), maria)])),
            profiles: vec![stone()],
            ..MemoryStore::default()
        })
    }

    pub fn set_balance(&self, customer_id: &str, cents: i64) {
        if let Some(c) = self.customers.lock().unwrap().get_mut(customer_id) {
            c.cashback_balance_cents = cents;
        }
    }

    pub fn line_count(&self) -> usize {
        self.sale_lines.lock().unwrap().len()
    }

    pub fn ledger_count(&self) -> usize {
        self.ledger.lock().unwrap().len()
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn lookup(&self, query: &ProductLookup, limit: u32) -> CollaboratorResult<Vec<Product>> {
        let matches = |p: &&Product| match query {
            ProductLookup::Id(id) => &p.id == id,
            ProductLookup::Sku(sku) => &p.sku == sku,
            ProductLookup::Barcode(code) => p.barcode.as_deref() == Some(code.as_str()),
            ProductLookup::NamePrefix(prefix) => p
                .name
                .to_lowercase()
                .starts_with(&prefix.to_lowercase()),
        };
        Ok(self
            .products
            .iter()
            .filter(matches)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn customer(&self, id: &str) -> CollaboratorResult<Option<Customer>> {
        Ok(self.customers.lock().unwrap().get(id).cloned())
    }
}

#[async_trait]
impl CashbackLedger for MemoryStore {
    async fn balance(&self, customer_id: &str) -> CollaboratorResult<Money> {
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .map(Customer::cashback_balance)
            .ok_or_else(|| CollaboratorError::NotFound {
                entity: "Customer".into(),
                id: customer_id.into(),
            })
    }
}

#[async_trait]
impl FeeProfileStore for MemoryStore {
    async fn profiles(&self, _company_id: &str) -> CollaboratorResult<Vec<FeeProfile>> {
        Ok(self.profiles.clone())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn sale_exists(&self, sale_id: &str) -> CollaboratorResult<bool> {
        Ok(self.taken_ids.lock().unwrap().contains(sale_id)
            || self
                .sale_lines
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.sale_id == sale_id))
    }

    async fn insert_sale_lines(&self, lines: &[SaleLine]) -> CollaboratorResult<()> {
        self.sale_lines.lock().unwrap().extend_from_slice(lines);
        Ok(())
    }

    async fn ensure_category(&self, name: &str) -> CollaboratorResult<LedgerCategory> {
        let mut categories = self.categories.lock().unwrap();
        if let Some(existing) = categories.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let category = LedgerCategory {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn insert_ledger_entries(&self, entries: &[LedgerEntry]) -> CollaboratorResult<()> {
        self.ledger_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Storage("database is locked".into()));
        }
        self.ledger.lock().unwrap().extend_from_slice(entries);
        Ok(())
    }
}

/// Always proposes the same id.
pub(crate) struct FixedIds(pub &'static str);

impl SaleIdGenerator for FixedIds {
    fn candidate(&self) -> String {
        self.0.to_string()
    }
}

/// Counts renders; optionally fails every one.
#[derive(Default)]
pub(crate) struct CountingRenderer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl ReceiptRenderer for CountingRenderer {
    async fn render(
        &self,
        _record: &SettlementRecord,
        _lines: &[CartLine],
    ) -> CollaboratorResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::Rendering("printer offline".into()));
        }
        Ok(())
    }
}

/// Engine over `store` with default ids and the given renderer.
pub(crate) async fn engine_with(
    store: Arc<MemoryStore>,
    renderer: Arc<CountingRenderer>,
    ids: Option<Arc<dyn SaleIdGenerator>>,
) -> CheckoutEngine {
    let mut builder = CheckoutEngine::builder(CheckoutConfig::default())
        .with_catalog(store.clone())
        .with_customers(store.clone())
        .with_cashback(store.clone())
        .with_fee_profiles(store.clone())
        .with_store(store)
        .with_renderer(renderer);
    if let Some(ids) = ids {
        builder = builder.with_id_generator(ids);
    }
    builder.build().await.unwrap()
}
