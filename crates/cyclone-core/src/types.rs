//! # Domain Types
//!
//! Core domain types used throughout Cyclone.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Receivable    │   │  StockMovement  │   │   Installment   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  link_key ★     │   │  sku            │   │  contract_id    │       │
//! │  │  status         │   │  direction      │   │  number (1..N)  │       │
//! │  │  amount_cents   │   │  reason         │   │  due_on         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ★ link_key is the idempotency anchor: at most one non-cancelled       │
//! │    receivable may exist per linking key at any time.                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockItem     │   │ReceivableStatus │   │ MovementReason  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku (business) │   │  Pending        │   │  Sale           │       │
//! │  │  quantity (live)│   │  Paid           │   │  ServiceUse     │       │
//! │  │  minimum        │   │  Overdue        │   │  Return         │       │
//! │  └─────────────────┘   │  Cancelled      │   │  ...            │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Enum Discipline
//! The system this replaces kept statuses and movement reasons as free-form
//! strings. Here every such field is a tagged enum, validated at
//! construction, with the database representation derived via `sqlx::Type`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Order Kind
// =============================================================================

/// Which producer subsystem an order or contract belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// A retail sale order.
    Sale,
    /// An equipment rental contract.
    Rental,
    /// A technical service order.
    ServiceOrder,
}

impl OrderKind {
    /// Stable label used in descriptions and audit detail lines.
    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::Sale => "Sale",
            OrderKind::Rental => "Rental",
            OrderKind::ServiceOrder => "Service order",
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Shared status shape across Sales, Rentals and Service Orders.
///
/// Only `Completed` and `Cancelled` are reconciliation triggers; `Draft`
/// and `Open` are silent with respect to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Open,
    Completed,
    Cancelled,
}

// =============================================================================
// Installment / Receivable Status
// =============================================================================

/// Payment status of a rental or sale installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InstallmentStatus {
    /// The ledger status mirroring this installment status.
    ///
    /// The mapping is one-to-one: the receivable ledger is a one-way
    /// mirror of the source's payment state.
    pub fn as_receivable_status(&self) -> ReceivableStatus {
        match self {
            InstallmentStatus::Pending => ReceivableStatus::Pending,
            InstallmentStatus::Paid => ReceivableStatus::Paid,
            InstallmentStatus::Overdue => ReceivableStatus::Overdue,
            InstallmentStatus::Cancelled => ReceivableStatus::Cancelled,
        }
    }
}

/// Status of a ledger receivable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReceivableStatus {
    /// Money owed, not yet received.
    Pending,
    /// Money received in full.
    Paid,
    /// Pending and past its due date.
    Overdue,
    /// Derived effect reversed; kept for history, excluded from totals.
    Cancelled,
}

impl ReceivableStatus {
    /// Whether the entry still counts against the linking-key uniqueness
    /// invariant (everything except `Cancelled`).
    pub fn is_live(&self) -> bool {
        !matches!(self, ReceivableStatus::Cancelled)
    }

    /// Whether money is still outstanding (pending or overdue).
    pub fn is_open(&self) -> bool {
        matches!(self, ReceivableStatus::Pending | ReceivableStatus::Overdue)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankSlip,
    Pix,
}

// =============================================================================
// Stock Movement Enums
// =============================================================================

/// Direction of an inventory delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    /// Signed delta applied to the live quantity counter.
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementDirection::In => quantity,
            MovementDirection::Out => -quantity,
        }
    }
}

/// Why an inventory delta happened.
///
/// Rentals never move stock (equipment is tracked per-unit by the rental
/// subsystem), so there is no rental reason here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Restock from a supplier.
    Purchase,
    /// Consumed by a sale line item.
    Sale,
    /// Consumed as a part on a service order.
    ServiceUse,
    /// Compensating entry: line item removed or parent cancelled.
    Return,
    /// Manual correction.
    Adjustment,
}

// =============================================================================
// Receivable
// =============================================================================

/// One unit of money owed to the business, mirrored from Sales/Rental/
/// Service billing state. The ledger's unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receivable {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Deterministic linking key tying this entry back to its originating
    /// entity. At most one non-cancelled entry per key (enforced by a
    /// partial unique index at write time).
    pub link_key: String,

    /// Human-readable description, e.g. "Rental #C-17 - installment 2/12".
    pub description: String,

    /// Debtor reference (client identifier).
    pub debtor: String,

    /// Producer subsystem that originated this entry.
    pub source_kind: OrderKind,

    /// Originating order/contract identifier.
    pub source_id: String,

    /// Face amount in cents.
    pub amount_cents: i64,

    /// Issue date of the underlying document.
    pub issued_on: NaiveDate,

    /// Due date.
    pub due_on: NaiveDate,

    pub status: ReceivableStatus,

    /// Amount actually received, once paid.
    pub paid_amount_cents: Option<i64>,

    /// Date the payment was received.
    pub paid_on: Option<NaiveDate>,

    pub payment_method: Option<PaymentMethod>,

    /// Free-form annotation (cancellation markers, import notes).
    pub note: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    /// Face amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Paid amount as Money (zero when unpaid).
    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents.unwrap_or(0))
    }
}

// =============================================================================
// Stock Item
// =============================================================================

/// A stock-keeping unit with its live denormalized quantity counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    /// Stock Keeping Unit - business identifier and primary key.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Current live quantity. Updated transactionally alongside each
    /// movement, always via a relative delta.
    pub quantity: i64,

    /// Reorder threshold; availability checks warn at or below it.
    pub minimum_quantity: i64,

    /// Unit cost in cents (for movement valuation).
    pub unit_cost_cents: i64,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Checks whether the live quantity sits at or below the minimum.
    pub fn below_minimum(&self) -> bool {
        self.quantity <= self.minimum_quantity
    }

    /// Unit cost as Money.
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One atomic inventory quantity delta, append-only.
///
/// `stock_before`/`stock_after` snapshot the live counter at the moment of
/// the movement. They exist for audit, never for recomputation - the live
/// quantity is always updated by a relative delta in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub sku: String,
    pub direction: MovementDirection,
    pub reason: MovementReason,
    pub quantity: i64,
    pub unit_cost_cents: i64,

    /// Originating producer, when the movement was derived from an order.
    pub source_kind: Option<OrderKind>,
    pub source_id: Option<String>,

    /// Marks a compensating `in` movement emitted because the parent order
    /// was cancelled. The no-double-reversal guard keys on this flag.
    pub cancellation: bool,

    pub stock_before: i64,
    pub stock_after: i64,

    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed delta this movement applied to the live counter.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.direction.signed(self.quantity)
    }
}

// =============================================================================
// Installment
// =============================================================================

/// One installment of a rental contract's payment schedule.
///
/// Generated in a single batch when a contract is activated; numbers 1..N
/// are contiguous and unique per contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Installment {
    pub id: String,
    pub contract_id: String,

    /// Sequence number, 1-based.
    pub number: i64,

    pub amount_cents: i64,
    pub due_on: NaiveDate,

    /// Month reference in `MM/YYYY` form, e.g. "03/2025".
    pub reference: String,

    pub status: InstallmentStatus,
    pub paid_amount_cents: Option<i64>,
    pub paid_on: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    /// Face amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Audit Record
// =============================================================================

/// One diagnostic trace row for a derived effect. Never read back by the
/// engine; reporting only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditRecord {
    pub id: String,

    /// Effect kind tag, e.g. "receivable_created", "movement_recorded".
    pub effect: String,

    pub link_key: Option<String>,
    pub sku: Option<String>,

    /// Human-readable detail line.
    pub detail: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_signed() {
        assert_eq!(MovementDirection::In.signed(5), 5);
        assert_eq!(MovementDirection::Out.signed(5), -5);
    }

    #[test]
    fn test_receivable_status_predicates() {
        assert!(ReceivableStatus::Pending.is_live());
        assert!(ReceivableStatus::Paid.is_live());
        assert!(ReceivableStatus::Overdue.is_live());
        assert!(!ReceivableStatus::Cancelled.is_live());

        assert!(ReceivableStatus::Pending.is_open());
        assert!(ReceivableStatus::Overdue.is_open());
        assert!(!ReceivableStatus::Paid.is_open());
        assert!(!ReceivableStatus::Cancelled.is_open());
    }

    #[test]
    fn test_installment_status_mirrors() {
        assert_eq!(
            InstallmentStatus::Paid.as_receivable_status(),
            ReceivableStatus::Paid
        );
        assert_eq!(
            InstallmentStatus::Overdue.as_receivable_status(),
            ReceivableStatus::Overdue
        );
    }

    #[test]
    fn test_below_minimum() {
        let item = StockItem {
            sku: "FILTER-X".to_string(),
            name: "HEPA filter".to_string(),
            quantity: 3,
            minimum_quantity: 3,
            unit_cost_cents: 4500,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(item.below_minimum());
    }
}
