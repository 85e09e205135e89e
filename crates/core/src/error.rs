//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing references, stock rules). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (empty name, non-positive quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is blocked by an existing reference.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An outbound movement (or a guarded reversal) would drive stock below zero.
    #[error("insufficient stock for product {product_id}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        on_hand: i64,
    },

    /// Stored data is referentially inconsistent. Indicates a prior bug or an
    /// ungoverned write, never user error.
    #[error("integrity fault: {0}")]
    Integrity(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn insufficient_stock(product_id: ProductId, requested: i64, on_hand: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            requested,
            on_hand,
        }
    }
}
