//! # Trigger Events
//!
//! The interface boundary between the producer subsystems (Sales, Rentals,
//! Service Orders) and the reconciliation engine.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Trigger Sources                                 │
//! │                                                                         │
//! │  Sales ───────┐                                                         │
//! │  Rentals ─────┼──► TriggerEvent ──► Engine ──► Ledger / Inventory      │
//! │  ServiceOrders┘                                                         │
//! │                                                                         │
//! │  Events are self-contained: the producers own their orders and line    │
//! │  items, so each event carries every field the engine needs (amounts,   │
//! │  due dates, stocked lines). The engine persists ONLY the two ledgers   │
//! │  and the rental installment schedule.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dispatch is synchronous and in-process: the engine runs inside the same
//! transaction boundary as the triggering write, so a failed reconciliation
//! rejects the originating save (fail closed).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{InstallmentStatus, OrderKind, OrderStatus, PaymentMethod};

// =============================================================================
// References
// =============================================================================

/// Reference to an order or contract owned by a producer subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub kind: OrderKind,
    pub id: String,
}

impl OrderRef {
    pub fn new(kind: OrderKind, id: impl Into<String>) -> Self {
        OrderRef {
            kind,
            id: id.into(),
        }
    }
}

/// Reference to one installment of a sale or rental payment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentRef {
    /// `Sale` or `Rental`; service orders have no installments.
    pub kind: OrderKind,
    pub order_id: String,
    /// Sequence number, 1-based.
    pub number: i64,
}

/// One stocked line item of an order, as carried on order-level events so
/// the cancel rule can reverse inventory without reading producer tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockedLine {
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Billing snapshot attached to a service-order completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBilling {
    pub debtor: String,
    pub total_cents: i64,
    /// Warranty work never produces a receivable.
    pub under_warranty: bool,
    pub issued_on: NaiveDate,
    /// Present when the order was already settled at completion time
    /// (e.g. a retroactively imported paid service order).
    pub paid_amount_cents: Option<i64>,
    pub paid_on: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
}

// =============================================================================
// Trigger Event
// =============================================================================

/// A state transition in a producer subsystem that the engine reacts to.
///
/// Producers fire these synchronously from their own save paths; the engine
/// applies every interested reconciliation rule inside one transaction and
/// returns the derived effects (or an error that must abort the save).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// A line item was added to an order.
    LineItemCreated {
        order: OrderRef,
        /// Status of the parent at the moment of the save; items added to
        /// a cancelled parent are ignored.
        order_status: OrderStatus,
        /// `None` for non-stocked lines (labour, rented equipment).
        sku: Option<String>,
        quantity: i64,
        unit_price_cents: i64,
    },

    /// A line item was removed from an order.
    LineItemDeleted {
        order: OrderRef,
        sku: Option<String>,
        quantity: i64,
        unit_price_cents: i64,
        /// True when the delete is part of a parent cancellation; the
        /// cancel rule owns the reversal in that case.
        parent_cancelling: bool,
    },

    /// An installment was created or changed payment status.
    ///
    /// Creation arrives as a transition to `Pending` (or directly to
    /// `Paid` for retroactive imports); the create rule is idempotent on
    /// the linking key either way.
    InstallmentStatusChanged {
        source: InstallmentRef,
        debtor: String,
        /// Total count of the plan, for "installment n/N" descriptions.
        total_installments: i64,
        face_amount_cents: i64,
        issued_on: NaiveDate,
        due_on: NaiveDate,
        new_status: InstallmentStatus,
        paid_amount_cents: Option<i64>,
        paid_on: Option<NaiveDate>,
        payment_method: Option<PaymentMethod>,
    },

    /// An order or contract changed status.
    ///
    /// Only `Completed` (service billing) and `Cancelled` (reversal) are
    /// reconciliation triggers; other transitions are silent.
    OrderStatusChanged {
        order: OrderRef,
        new_status: OrderStatus,
        /// Present on service-order completion.
        billing: Option<ServiceBilling>,
        /// The order's stocked line items, so cancellation can reverse
        /// inventory.
        lines: Vec<StockedLine>,
    },
}

impl TriggerEvent {
    /// Short tag for tracing and audit detail lines.
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::LineItemCreated { .. } => "line_item_created",
            TriggerEvent::LineItemDeleted { .. } => "line_item_deleted",
            TriggerEvent::InstallmentStatusChanged { .. } => "installment_status_changed",
            TriggerEvent::OrderStatusChanged { .. } => "order_status_changed",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
