//! # Validation Module
//!
//! Input validation for event payloads before reconciliation runs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Producer subsystems (Sales / Rentals / Service Orders)       │
//! │  ├── Their own form/API validation                                     │
//! │  └── We do not trust it                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (engine entry point)                             │
//! │  ├── Field presence and range checks on event payloads                 │
//! │  └── Rejects before any ledger row is touched                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── Partial UNIQUE index on link_key (idempotency anchor)             │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use cyclone_core::validation::{validate_sku, validate_quantity};
//!
//! // Validate SKU carried on a line-item event
//! validate_sku("WD-VAC-2000").unwrap();
//!
//! // Validate quantity before a stock movement
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use cyclone_core::validation::validate_sku;
///
/// assert!(validate_sku("WD-VAC-2000").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a debtor (customer) name carried on a receivable event.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_debtor(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "debtor".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "debtor".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a source order/contract identifier.
///
/// ## Rules
/// - Must not be empty
/// - Maximum 64 characters (linking keys embed it verbatim)
pub fn validate_source_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "source_id".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "source_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value on a line item or stock movement.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (warranty work, free items); the receivable-creation
///   rule skips zero totals itself
///
/// ## Example
/// ```rust
/// use cyclone_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents(1099).is_ok());  // R$ 10.99
/// assert!(validate_amount_cents(0).is_ok());     // warranty / free
/// assert!(validate_amount_cents(-100).is_err()); // invalid
/// ```
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot settle zero or negative amounts
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a contract billing day.
///
/// ## Rules
/// - Must be between 1 and 31
/// - Days above 28 are accepted here and clamped by the schedule
///   generator, so every month lands on a valid calendar day
pub fn validate_billing_day(day: u32) -> ValidationResult<()> {
    if !(1..=31).contains(&day) {
        return Err(ValidationError::OutOfRange {
            field: "billing_day".to_string(),
            min: 1,
            max: 31,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        // Valid SKUs
        assert!(validate_sku("WD-VAC-2000").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("filter_hepa").is_ok());

        // Invalid SKUs
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_debtor() {
        assert!(validate_debtor("Maria Souza").is_ok());
        assert!(validate_debtor("").is_err());
        assert!(validate_debtor(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_source_id() {
        assert!(validate_source_id("V-2025-0042").is_ok());
        assert!(validate_source_id("").is_err());
        assert!(validate_source_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents(0).is_ok());
        assert!(validate_amount_cents(1099).is_ok());
        assert!(validate_amount_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(500).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-1).is_err());
    }

    #[test]
    fn test_validate_billing_day() {
        assert!(validate_billing_day(1).is_ok());
        assert!(validate_billing_day(28).is_ok());
        assert!(validate_billing_day(31).is_ok());
        assert!(validate_billing_day(0).is_err());
        assert!(validate_billing_day(32).is_err());
    }
}
