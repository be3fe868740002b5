//! # Customer Repository
//!
//! Customer directory and cashback balance reads.
//!
//! The balance column is owned by the cashback ledger; the checkout engine
//! only reads it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use caixa_core::Customer;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, cashback_balance_cents FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Reads the current cashback balance in cents.
    ///
    /// ## Returns
    /// * `Ok(None)` - Customer does not exist
    pub async fn cashback_balance(&self, id: &str) -> DbResult<Option<i64>> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT cashback_balance_cents FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        debug!(customer_id = %id, ?balance, "Cashback balance read");
        Ok(balance)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, cashback_balance_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.cashback_balance_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_customer_roundtrip_and_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let maria = Customer {
            id: "c-1".to_string(),
            name: "Maria Souza".to_string(),
            phone: Some("11999990000".to_string()),
            cashback_balance_cents: 2500,
        };
        repo.insert(&maria).await.unwrap();

        assert_eq!(repo.get_by_id("c-1").await.unwrap(), Some(maria));
        assert_eq!(repo.cashback_balance("c-1").await.unwrap(), Some(2500));
        assert_eq!(repo.cashback_balance("missing").await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
