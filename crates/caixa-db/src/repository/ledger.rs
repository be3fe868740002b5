//! # Ledger Repository
//!
//! Receivables derived from settled sales, filed under a ledger category.
//!
//! ## Category Upsert
//! ```text
//! Terminal A ──► ensure_category("Vendas") ─┐
//!                                           ├──► INSERT … ON CONFLICT(name) DO NOTHING
//! Terminal B ──► ensure_category("Vendas") ─┘         │
//!                                                     ▼
//!                                     SELECT id WHERE name = 'Vendas'
//!                                     (both get the same row, never an error)
//! ```
//!
//! Entry ids are generated when the sale is composed, so replaying a batch
//! whose commit acknowledgement was lost skips the rows already stored.

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use caixa_core::{LedgerCategory, LedgerEntry};

const LEDGER_ENTRY_COLUMNS: &str = r#"
    id, sale_id, category_id, description, method, amount_cents, due_date,
    status, installment_number, installment_count, customer_id, created_at
"#;

/// Repository for ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Returns the category named `name`, creating it if absent.
    ///
    /// Safe under concurrent callers: a lost race is a no-op insert.
    pub async fn ensure_category(&self, name: &str) -> DbResult<LedgerCategory> {
        let inserted = sqlx::query(
            "INSERT INTO ledger_categories (id, name) VALUES (?1, ?2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!(category = %name, "Ledger category created");
        }

        let category = sqlx::query_as::<_, LedgerCategory>(
            "SELECT id, name FROM ledger_categories WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("LedgerCategory", name))?;

        Ok(category)
    }

    /// Inserts the receivables of one sale in a single transaction.
    ///
    /// Entries whose id is already stored are skipped.
    pub async fn insert_entries(&self, entries: &[LedgerEntry]) -> DbResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries (
                    id, sale_id, category_id, description, method, amount_cents, due_date,
                    status, installment_number, installment_count, customer_id, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.sale_id)
            .bind(&entry.category_id)
            .bind(&entry.description)
            .bind(entry.method)
            .bind(entry.amount_cents)
            .bind(entry.due_date)
            .bind(entry.status)
            .bind(entry.installment_number)
            .bind(entry.installment_count)
            .bind(&entry.customer_id)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %entries[0].sale_id,
            entries = entries.len(),
            "Ledger entries committed"
        );
        Ok(())
    }

    /// Loads the receivables of a sale ordered by due date.
    pub async fn entries_for_sale(&self, sale_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE sale_id = ?1 \
             ORDER BY due_date, installment_number",
            LEDGER_ENTRY_COLUMNS
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(sale_id = %sale_id, count = entries.len(), "Ledger entries loaded");
        Ok(entries)
    }

    /// Counts categories with `name` (diagnostics and tests).
    pub async fn count_categories(&self, name: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_categories WHERE name = ?1")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caixa_core::{LedgerStatus, PaymentKind, SALES_CATEGORY};
    use chrono::{NaiveDate, Utc};

    fn entry(sale_id: &str, category_id: &str, n: i64) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            category_id: category_id.to_string(),
            description: format!("Venda {} - Crediário {}/2", sale_id, n),
            method: PaymentKind::StoreCredit,
            amount_cents: 5000,
            due_date: NaiveDate::from_ymd_opt(2024, n as u32, 10).unwrap(),
            status: LedgerStatus::Pending,
            installment_number: Some(n),
            installment_count: Some(2),
            customer_id: Some("c-1".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_ensure_category_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ledger();

        let first = repo.ensure_category(SALES_CATEGORY).await.unwrap();
        let second = repo.ensure_category(SALES_CATEGORY).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.count_categories(SALES_CATEGORY).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_category_creates_one_row() {
        let path = std::env::temp_dir().join(format!("caixa-ledger-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = db.ledger();
                tokio::spawn(async move { repo.ensure_category(SALES_CATEGORY).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(db.ledger().count_categories(SALES_CATEGORY).await.unwrap(), 1);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_insert_and_load_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ledger();
        let category = repo.ensure_category(SALES_CATEGORY).await.unwrap();

        repo.insert_entries(&[entry("S1", &category.id, 2), entry("S1", &category.id, 1)])
            .await
            .unwrap();

        let entries = repo.entries_for_sale("S1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].installment_number, Some(1));
        assert_eq!(entries[0].status, LedgerStatus::Pending);
        assert_eq!(entries[0].method, PaymentKind::StoreCredit);
    }

    #[tokio::test]
    async fn test_replayed_entries_are_skipped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ledger();
        let category = repo.ensure_category(SALES_CATEGORY).await.unwrap();
        let batch = [entry("S1", &category.id, 1), entry("S1", &category.id, 2)];

        repo.insert_entries(&batch).await.unwrap();
        // Same batch again, as after a commit whose reply never arrived.
        repo.insert_entries(&batch).await.unwrap();

        let entries = repo.entries_for_sale("S1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 10_000);
    }

    #[tokio::test]
    async fn test_entries_require_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .ledger()
            .insert_entries(&[entry("S1", "missing", 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
