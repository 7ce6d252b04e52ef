//! # Installment Schedule Generator
//!
//! Derives a rental contract's fixed installment schedule from its terms.
//!
//! ## Schedule Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ContractTerms { start: 2025-01-10, term: 3, amount: 100.00, day: 10 } │
//! │                                                                         │
//! │       │ build_schedule()                                               │
//! │       ▼                                                                 │
//! │  #1  due 2025-01-10  R$ 100.00  ref "01/2025"                          │
//! │  #2  due 2025-02-10  R$ 100.00  ref "02/2025"                          │
//! │  #3  due 2025-03-10  R$ 100.00  ref "03/2025"                          │
//! │                                                                         │
//! │  Billing days above 28 are clamped to the 28th so every month of the   │
//! │  contract lands on a valid calendar day (no February special case).    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is pure date math. Persisting the schedule and deriving the
//! matching receivables is the engine's job (`activate_contract`), which
//! discards only still-pending installments before regenerating - paid and
//! cancelled installments are preserved as history.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::MAX_BILLING_DAY;

// =============================================================================
// Contract Terms
// =============================================================================

/// The billing terms of a rental contract, as provided by the Rentals
/// producer when a contract is activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTerms {
    pub contract_id: String,
    /// Debtor reference carried onto every derived receivable.
    pub debtor: String,
    pub start_date: NaiveDate,
    pub term_months: u32,
    pub monthly_amount_cents: i64,
    /// Desired day-of-month for due dates; clamped to 28.
    pub billing_day: u32,
}

/// One entry of a generated schedule. Plain data; gets an id and
/// timestamps when persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentSpec {
    /// Sequence number, 1-based.
    pub number: i64,
    pub due_on: NaiveDate,
    pub amount_cents: i64,
    /// Month reference in `MM/YYYY` form.
    pub reference: String,
}

// =============================================================================
// Generation
// =============================================================================

/// Builds the full installment schedule for a contract.
///
/// Produces `term_months` entries, one per month starting from the
/// contract's start month, due on `billing_day` clamped to the 28th,
/// numbered 1..N.
///
/// ## Errors
/// Invalid terms (zero term, non-positive amount, billing day outside
/// 1..=31) and date overflow are rejected before any entry is built.
pub fn build_schedule(terms: &ContractTerms) -> CoreResult<Vec<InstallmentSpec>> {
    if terms.contract_id.trim().is_empty() {
        return Err(CoreError::InvalidContractTerms {
            reason: "empty contract identifier".to_string(),
        });
    }
    if terms.term_months == 0 {
        return Err(CoreError::InvalidContractTerms {
            reason: "term must be at least one month".to_string(),
        });
    }
    if terms.monthly_amount_cents <= 0 {
        return Err(CoreError::InvalidContractTerms {
            reason: format!(
                "monthly amount must be positive, got {} cents",
                terms.monthly_amount_cents
            ),
        });
    }
    if terms.billing_day == 0 || terms.billing_day > 31 {
        return Err(CoreError::InvalidContractTerms {
            reason: format!("billing day must be 1..=31, got {}", terms.billing_day),
        });
    }

    let day = terms.billing_day.min(MAX_BILLING_DAY);
    let mut schedule = Vec::with_capacity(terms.term_months as usize);

    for i in 0..terms.term_months {
        let due_on = terms
            .start_date
            .checked_add_months(Months::new(i))
            .and_then(|d| d.with_day(day))
            .ok_or_else(|| CoreError::InvalidContractTerms {
                reason: format!("due date overflow at installment {}", i + 1),
            })?;

        schedule.push(InstallmentSpec {
            number: i64::from(i) + 1,
            due_on,
            amount_cents: terms.monthly_amount_cents,
            reference: due_on.format("%m/%Y").to_string(),
        });
    }

    Ok(schedule)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(start: NaiveDate, months: u32, day: u32) -> ContractTerms {
        ContractTerms {
            contract_id: "C-1".to_string(),
            debtor: "client-9".to_string(),
            start_date: start,
            term_months: months,
            monthly_amount_cents: 10_000,
            billing_day: day,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_three_month_schedule() {
        // The worked example: 3 months, R$ 100.00, started 2025-01-10.
        let schedule = build_schedule(&terms(date(2025, 1, 10), 3, 10)).unwrap();

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].number, 1);
        assert_eq!(schedule[0].due_on, date(2025, 1, 10));
        assert_eq!(schedule[1].due_on, date(2025, 2, 10));
        assert_eq!(schedule[2].due_on, date(2025, 3, 10));
        assert!(schedule.iter().all(|s| s.amount_cents == 10_000));
        assert_eq!(schedule[1].reference, "02/2025");
    }

    #[test]
    fn test_billing_day_clamped_to_28() {
        let schedule = build_schedule(&terms(date(2025, 1, 31), 3, 31)).unwrap();

        // Every installment lands on the 28th, including February.
        assert_eq!(schedule[0].due_on, date(2025, 1, 28));
        assert_eq!(schedule[1].due_on, date(2025, 2, 28));
        assert_eq!(schedule[2].due_on, date(2025, 3, 28));
    }

    #[test]
    fn test_numbers_contiguous_from_one() {
        let schedule = build_schedule(&terms(date(2025, 6, 5), 12, 5)).unwrap();
        let numbers: Vec<i64> = schedule.iter().map(|s| s.number).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<i64>>());
    }

    #[test]
    fn test_year_rollover() {
        let schedule = build_schedule(&terms(date(2025, 11, 15), 4, 15)).unwrap();
        assert_eq!(schedule[2].due_on, date(2026, 1, 15));
        assert_eq!(schedule[2].reference, "01/2026");
    }

    #[test]
    fn test_rejects_invalid_terms() {
        assert!(build_schedule(&terms(date(2025, 1, 1), 0, 10)).is_err());
        assert!(build_schedule(&terms(date(2025, 1, 1), 3, 0)).is_err());
        assert!(build_schedule(&terms(date(2025, 1, 1), 3, 32)).is_err());

        let mut t = terms(date(2025, 1, 1), 3, 10);
        t.monthly_amount_cents = 0;
        assert!(build_schedule(&t).is_err());

        let mut t = terms(date(2025, 1, 1), 3, 10);
        t.contract_id = String::new();
        assert!(build_schedule(&t).is_err());
    }
}
