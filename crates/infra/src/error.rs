//! Engine/store error model.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `LedgerError` as follows:
//!
//! | SQLx error | SQLite extended code | LedgerError | Scenario |
//! |---|---|---|---|
//! | Database (foreign key) | `787` | `Conflict` | Product delete racing a movement insert, or a movement for a missing product |
//! | Database (unique) | `2067` / `1555` | `Conflict` | Duplicate key |
//! | Database (check) | `275` | `Validation` | Non-positive quantity, unknown kind, blank name |
//! | Anything else | any | `Store` | I/O, locking, trigger aborts, pool closed |

use sqlx::error::ErrorKind;
use thiserror::Error;

use stockledger_core::{DomainError, ProductId};

/// Result type used by the registry, the ledger and the engine.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input (empty name, non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation blocked by an existing reference.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Outbound (or guarded reversal) exceeds on-hand stock.
    #[error("insufficient stock for product {product_id}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        on_hand: i64,
    },

    /// Referential inconsistency detected in stored data.
    #[error("integrity fault: {0}")]
    Integrity(String),

    /// The underlying store failed; the surrounding transaction was rolled back.
    #[error("storage error in {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl LedgerError {
    /// Stable machine-readable code for presentation layers.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::Integrity(_) => "integrity_error",
            LedgerError::Store { .. } => "store_error",
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::NotFound(msg) => LedgerError::NotFound(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::InsufficientStock {
                product_id,
                requested,
                on_hand,
            } => LedgerError::InsufficientStock {
                product_id,
                requested,
                on_hand,
            },
            DomainError::Integrity(msg) => LedgerError::Integrity(msg),
        }
    }
}

/// Map SQLx errors to `LedgerError`.
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = format!("{} (in {})", db_err.message(), operation);
        match db_err.kind() {
            ErrorKind::ForeignKeyViolation | ErrorKind::UniqueViolation => {
                return LedgerError::Conflict(msg);
            }
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                return LedgerError::Validation(msg);
            }
            _ => {}
        }
    }
    LedgerError::Store {
        operation,
        source: err,
    }
}
