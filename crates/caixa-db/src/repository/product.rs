//! # Product Repository
//!
//! Catalog lookups used by the checkout engine.
//!
//! ## Lookup Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductLookup::Id("…uuid…")     ──► WHERE id = ?          (0..1)      │
//! │  ProductLookup::Sku("ARROZ-5KG") ──► WHERE sku = ?         (0..1)      │
//! │  ProductLookup::Barcode("789…")  ──► WHERE barcode = ?     (0..n)      │
//! │  ProductLookup::NamePrefix("arr")──► WHERE name LIKE 'arr%' (0..limit) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use caixa_core::{Product, ProductLookup};

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, price_cents";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Runs a catalog lookup.
    ///
    /// Only active products are returned. `limit` caps name-prefix results.
    pub async fn lookup(&self, query: &ProductLookup, limit: u32) -> DbResult<Vec<Product>> {
        debug!(?query, limit, "Looking up products");

        let products = match query {
            ProductLookup::Id(id) => self.get_by_id(id).await?.into_iter().collect(),
            ProductLookup::Sku(sku) => self.get_by_sku(sku).await?.into_iter().collect(),
            ProductLookup::Barcode(barcode) => self.find_by_barcode(barcode).await?,
            ProductLookup::NamePrefix(prefix) => self.search_prefix(prefix, limit).await?,
        };

        debug!(count = products.len(), "Lookup returned products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND is_active = 1",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE sku = ?1 AND is_active = 1",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Finds products by barcode. Barcodes are not unique across SKUs.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE barcode = ?1 AND is_active = 1 ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Name prefix search (LIKE is case-insensitive for ASCII in SQLite).
    ///
    /// An empty prefix lists active products by name.
    pub async fn search_prefix(&self, prefix: &str, limit: u32) -> DbResult<Vec<Product>> {
        let pattern = format!("{}%", escape_like(prefix.trim()));
        let sql = format!(
            "SELECT {} FROM products \
             WHERE name LIKE ?1 ESCAPE '\\' AND is_active = 1 \
             ORDER BY name LIMIT ?2",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, barcode, name, price_cents, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(sku = %product.sku, "Product inserted");
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
