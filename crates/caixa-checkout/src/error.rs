//! # Checkout Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │ CollaboratorError│  │   CommitError    │  │    CheckoutError     │  │
//! │  │                  │  │                  │  │                      │  │
//! │  │ NotFound         │  │ IdentifierExh.   │  │ Payment / Core       │  │
//! │  │ Duplicate        │  │ PersistenceFail. │  │ Collaborator         │  │
//! │  │ Storage          │  │ PartialCommit    │  │ UnknownCustomer      │  │
//! │  │ Rendering        │  │ AlreadyCommitted │  │ FeeProfileLocked     │  │
//! │  └──────────────────┘  │ StalePlan        │  │ DraftClosed          │  │
//! │                        │ PlanRejected     │  └──────────────────────┘  │
//! │                        └──────────────────┘                            │
//! │                                                                         │
//! │  Every CommitError leaves the draft intact.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caixa_core::{CoreError, Money, PaymentError, ValidationError};
use caixa_db::DbError;
use thiserror::Error;

/// Result type alias for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Result type alias for engine operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Failure reported by an injected collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Receipt rendering failed: {0}")]
    Rendering(String),
}

impl From<DbError> for CollaboratorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CollaboratorError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                CollaboratorError::Duplicate { field, value }
            }
            other => CollaboratorError::Storage(other.to_string()),
        }
    }
}

// =============================================================================
// Commit Errors
// =============================================================================

/// Failure of `commit_settlement` or `retry_ledger`.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Every generated sale id was already taken.
    #[error("No free sale identifier after {attempts} attempts")]
    IdentifierExhausted { attempts: u32 },

    /// Nothing was written; the draft can be committed again.
    #[error("Persistence failed: {0}")]
    PersistenceFailure(#[source] CollaboratorError),

    /// Sale rows are stored, ledger entries are not.
    #[error("Sale {sale_id} committed but its ledger entries were not: {source}")]
    PartialCommitFailure {
        sale_id: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("Sale {sale_id} is already committed")]
    AlreadyCommitted { sale_id: String },

    /// The plan was validated against a different amount due.
    #[error("Payment plan validated for {validated} but the sale now totals {current}")]
    StalePlan { validated: Money, current: Money },

    /// The plan's legs do not settle this sale.
    #[error("Payment plan rejected: {0}")]
    PlanRejected(#[source] PaymentError),

    #[error("No pending ledger entries to retry")]
    NothingToRetry,

    #[error(transparent)]
    Composition(#[from] CoreError),
}

impl CommitError {
    /// Returns true if repeating the same call can succeed without edits.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommitError::IdentifierExhausted { .. }
                | CommitError::PersistenceFailure(_)
                | CommitError::PartialCommitFailure { .. }
        )
    }

    /// Sale id that already reached storage, if any.
    pub fn committed_sale_id(&self) -> Option<&str> {
        match self {
            CommitError::PartialCommitFailure { sale_id, .. }
            | CommitError::AlreadyCommitted { sale_id } => Some(sale_id),
            _ => None,
        }
    }
}

// =============================================================================
// Checkout Errors
// =============================================================================

/// Failure of a non-commit engine operation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Customer not found: {0}")]
    UnknownCustomer(String),

    #[error("Fee profile not found: {0}")]
    UnknownFeeProfile(String),

    /// A sale keeps the first machine chosen for it.
    #[error("Fee profile already locked to '{locked}'")]
    FeeProfileLocked { locked: String },

    /// The draft reached storage and can no longer be edited.
    #[error("Sale {sale_id} is closed for edits")]
    DraftClosed { sale_id: String },

    #[error("Engine setup failed: {0}")]
    Setup(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),

    #[error("Invalid checkout configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}
