//! # Database Errors
//!
//! `sqlx` failures sorted into the few cases the checkout engine reacts to
//! differently.
//!
//! ```text
//! sqlx::Error ──► DbError ──► CollaboratorError ──► CommitError
//!                 (here)      (caixa-checkout)      PersistenceFailure /
//!                                                    PartialCommitFailure
//! ```
//!
//! A duplicate sale id and a missing ledger category are both constraint
//! failures in SQLite; they arrive here as `UniqueViolation` and
//! `ForeignKeyViolation` so callers never parse driver messages.

use thiserror::Error;

/// Errors raised by the pool and the repositories.
#[derive(Debug, Error)]
pub enum DbError {
    /// A lookup by key found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row: duplicate SKU, sale line, category.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a parent that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file could not be opened, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQL ran and SQLite refused it (CHECK constraints included).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A batch was rejected before or during its transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored row no longer maps to a domain value.
    #[error("Invalid {table} row: {reason}")]
    InvalidRow { table: String, reason: String },

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Lost a create-if-absent race, or the key is already taken.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// Sorts a driver message by the constraint it names.
///
/// SQLite reports `UNIQUE constraint failed: <table>.<column>` and
/// `FOREIGN KEY constraint failed`.
fn classify_database_message(msg: &str) -> DbError {
    if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
        return DbError::UniqueViolation {
            field: columns.to_string(),
            value: "unknown".to_string(),
        };
    }
    if msg.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: msg.to_string(),
        };
    }
    DbError::QueryFailed(msg.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => classify_database_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
