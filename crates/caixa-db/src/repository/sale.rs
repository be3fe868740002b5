//! # Sale Repository
//!
//! Persists finalized sales as one row per cart line.
//!
//! ## Atomic Batch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_lines([line 1, line 2, line 3])                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT sale_lines (sale_id = S, line_number = 1)                    │
//! │    INSERT sale_lines (sale_id = S, line_number = 2)                    │
//! │    INSERT sale_lines (sale_id = S, line_number = 3)                    │
//! │  COMMIT   ◄── all rows or none                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use caixa_core::SaleLine;

const SALE_LINE_COLUMNS: &str = r#"
    id, sale_id, line_number, product_id, sku_snapshot, name_snapshot,
    unit_price_cents, quantity, line_discount_cents, line_total_cents,
    subtotal_cents, item_discount_cents, order_discount_cents, surcharge_cents,
    freight_cents, amount_due_cents, payment_snapshot, customer_id, seller,
    channel, receipt_preference, coupon_code, created_at
"#;

/// Repository for sale operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Checks whether any row already uses `sale_id`.
    pub async fn exists(&self, sale_id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM sale_lines WHERE sale_id = ?1 LIMIT 1")
                .bind(sale_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Inserts every line of one sale in a single transaction.
    ///
    /// ## Errors
    /// - `TransactionFailed` if the batch is empty or mixes sale ids
    /// - `UniqueViolation` if the sale was already persisted
    pub async fn insert_lines(&self, lines: &[SaleLine]) -> DbResult<()> {
        let sale_id = match lines.first() {
            Some(first) => first.sale_id.as_str(),
            None => return Err(DbError::TransactionFailed("empty sale batch".to_string())),
        };
        if lines.iter().any(|l| l.sale_id != sale_id) {
            return Err(DbError::TransactionFailed(format!(
                "batch for {} contains rows of another sale",
                sale_id
            )));
        }

        let mut tx = self.pool.begin().await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    id, sale_id, line_number, product_id, sku_snapshot, name_snapshot,
                    unit_price_cents, quantity, line_discount_cents, line_total_cents,
                    subtotal_cents, item_discount_cents, order_discount_cents, surcharge_cents,
                    freight_cents, amount_due_cents, payment_snapshot, customer_id, seller,
                    channel, receipt_preference, coupon_code, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                        ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
                "#,
            )
            .bind(&line.id)
            .bind(&line.sale_id)
            .bind(line.line_number)
            .bind(&line.product_id)
            .bind(&line.sku_snapshot)
            .bind(&line.name_snapshot)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.line_discount_cents)
            .bind(line.line_total_cents)
            .bind(line.subtotal_cents)
            .bind(line.item_discount_cents)
            .bind(line.order_discount_cents)
            .bind(line.surcharge_cents)
            .bind(line.freight_cents)
            .bind(line.amount_due_cents)
            .bind(&line.payment_snapshot)
            .bind(&line.customer_id)
            .bind(&line.seller)
            .bind(line.channel)
            .bind(line.receipt_preference)
            .bind(&line.coupon_code)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, lines = lines.len(), "Sale lines committed");
        Ok(())
    }

    /// Loads the lines of a sale in line order.
    pub async fn lines_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql = format!(
            "SELECT {} FROM sale_lines WHERE sale_id = ?1 ORDER BY line_number",
            SALE_LINE_COLUMNS
        );
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(sale_id = %sale_id, count = lines.len(), "Sale lines loaded");
        Ok(lines)
    }

    /// Counts the rows stored for a sale.
    pub async fn count_lines(&self, sale_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
