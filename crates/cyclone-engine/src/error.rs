//! # Engine Error Types
//!
//! The taxonomy callers branch on. A producer save path treats any of
//! these as "reject the save": every error aborts the event's transaction.
//!
//! Idempotent no-ops (duplicate linking key, already-reversed cancel) are
//! NOT errors; they come back in the effect list.

use thiserror::Error;

use cyclone_core::CoreError;
use cyclone_db::DbError;

/// Reconciliation failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any write: invalid payload or a business guard.
    #[error("guard rejection: {0}")]
    Guard(String),

    /// A sale asked for more stock than exists. Sales block; this is the
    /// only guard with its own variant because callers show it specially.
    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A stocked line referenced a SKU with no inventory record.
    ///
    /// Upstream data error: the producers are supposed to only sell what
    /// the catalog knows. Fail the trigger instead of skipping silently.
    #[error("unknown SKU: {0}")]
    MissingSku(String),

    /// An operation targeted a source record (installment, contract) that
    /// does not exist. Upstream data error, same as a missing SKU.
    #[error("unknown source: {0}")]
    MissingSource(String),

    /// An invariant broke mid-transaction (should not happen; the
    /// transaction is rolled back and the event can be retried).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Wrapped database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
            } => EngineError::InsufficientStock {
                sku,
                available,
                requested,
            },
            other => EngineError::Guard(other.to_string()),
        }
    }
}

impl From<cyclone_core::ValidationError> for EngineError {
    fn from(err: cyclone_core::ValidationError) -> Self {
        EngineError::Guard(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_stock_error_keeps_its_shape() {
        let err: EngineError = CoreError::InsufficientStock {
            sku: "FILTER-X".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientStock { .. }));
    }

    #[test]
    fn test_validation_becomes_guard() {
        let err: EngineError = cyclone_core::ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Guard(_)));
        assert_eq!(err.to_string(), "guard rejection: quantity must be positive");
    }
}
