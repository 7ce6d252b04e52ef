//! # Error Types
//!
//! Domain-specific error types for cyclone-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cyclone-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cyclone-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  cyclone-engine errors (separate crate)                                │
//! │  └── EngineError      - Guard rejections, upstream data errors,        │
//! │                         integrity failures                             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, link key, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A linking key could not be built from the given source reference.
    ///
    /// ## When This Occurs
    /// - Empty source identifier
    /// - Installment number below 1
    /// - Installment reference for an order kind that has no installments
    #[error("Invalid linking key: {reason}")]
    InvalidLinkKey { reason: String },

    /// Contract terms cannot produce a valid installment schedule.
    ///
    /// ## When This Occurs
    /// - Zero-month term
    /// - Non-positive monthly amount
    /// - Billing day outside 1..=31
    /// - Date arithmetic overflow (term reaching past chrono's range)
    #[error("Invalid contract terms: {reason}")]
    InvalidContractTerms { reason: String },

    /// Insufficient stock to complete a sale.
    ///
    /// Only Sales block on stock; Service Orders are allowed to go
    /// negative (backorder) and merely warn.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when event payloads don't meet requirements.
/// Used for early validation before reconciliation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
