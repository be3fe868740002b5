//! # Database Migrations
//!
//! Embedded SQL migrations for Caixa POS.
//!
//! ```text
//! Database::new ──► MIGRATOR.run ──► _sqlx_migrations
//!                        │
//!                        └── 0001_initial_schema.sql
//!                            products, customers, fee_profile_rates,
//!                            sale_lines, ledger_categories, ledger_entries
//! ```
//!
//! Schema changes go in a new `NNNN_description.sql` file; applied files are
//! checksummed and must stay untouched.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from this crate's `migrations` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Runs all pending database migrations.
///
/// Idempotent: safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    info!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
