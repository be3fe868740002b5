//! # SQLite Collaborators
//!
//! [`Database`] as the default implementation of every data port.

use async_trait::async_trait;

use caixa_core::{
    Customer, FeeProfile, LedgerCategory, LedgerEntry, Money, Product, ProductLookup, SaleLine,
};
use caixa_db::Database;

use crate::error::{CollaboratorError, CollaboratorResult};
use crate::ports::{CashbackLedger, CustomerDirectory, FeeProfileStore, PersistenceStore, ProductCatalog};

#[async_trait]
impl ProductCatalog for Database {
    async fn lookup(&self, query: &ProductLookup, limit: u32) -> CollaboratorResult<Vec<Product>> {
        Ok(self.products().lookup(query, limit).await?)
    }
}

#[async_trait]
impl CustomerDirectory for Database {
    async fn customer(&self, id: &str) -> CollaboratorResult<Option<Customer>> {
        Ok(self.customers().get_by_id(id).await?)
    }
}

#[async_trait]
impl CashbackLedger for Database {
    async fn balance(&self, customer_id: &str) -> CollaboratorResult<Money> {
        self.customers()
            .cashback_balance(customer_id)
            .await?
            .map(Money::from_cents)
            .ok_or_else(|| CollaboratorError::NotFound {
                entity: "Customer".to_string(),
                id: customer_id.to_string(),
            })
    }
}

#[async_trait]
impl FeeProfileStore for Database {
    async fn profiles(&self, company_id: &str) -> CollaboratorResult<Vec<FeeProfile>> {
        Ok(self.fee_profiles().list_for_company(company_id).await?)
    }
}

#[async_trait]
impl PersistenceStore for Database {
    async fn sale_exists(&self, sale_id: &str) -> CollaboratorResult<bool> {
        Ok(self.sales().exists(sale_id).await?)
    }

    async fn insert_sale_lines(&self, lines: &[SaleLine]) -> CollaboratorResult<()> {
        Ok(self.sales().insert_lines(lines).await?)
    }

    async fn ensure_category(&self, name: &str) -> CollaboratorResult<LedgerCategory> {
        Ok(self.ledger().ensure_category(name).await?)
    }

    async fn insert_ledger_entries(&self, entries: &[LedgerEntry]) -> CollaboratorResult<()> {
        Ok(self.ledger().insert_entries(entries).await?)
    }
}
