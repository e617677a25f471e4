//! Domain error model.

use thiserror::Error;

use crate::quantity::Pounds;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (validation, invariants, lifecycle
/// guards). Authorization and storage failures have their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a blank lot name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The lot (or ledger entry) does not exist.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale stream version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The lifecycle state machine rejected the requested change.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The lot has been discarded and accepts no further mutations.
    #[error("lot is discarded")]
    LotDiscarded,

    /// A weight, price or amount was non-positive or off the allowed increment.
    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    /// A sale asked for more pounds than the lot has on hand.
    #[error("insufficient inventory: requested {requested} lb, available {available} lb")]
    InsufficientInventory { requested: Pounds, available: Pounds },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn invalid_weight(msg: impl Into<String>) -> Self {
        Self::InvalidWeight(msg.into())
    }

    pub fn insufficient_inventory(requested: Pounds, available: Pounds) -> Self {
        Self::InsufficientInventory {
            requested,
            available,
        }
    }
}
