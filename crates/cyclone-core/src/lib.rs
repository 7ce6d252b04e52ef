//! # cyclone-core: Pure Business Logic for Cyclone
//!
//! Cyclone keeps three independently-edited subsystems - Sales, Rentals and
//! Service Orders - consistent with two shared ledgers: Accounts Receivable
//! and Inventory Stock. This crate is the pure half of that machinery: the
//! domain types, linking keys, installment schedule math and trigger events,
//! all with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cyclone Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Producers (Sales / Rentals / Service Orders)           │   │
//! │  │   external CRUD systems, specified only at the event boundary   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ TriggerEvent                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                     cyclone-engine                              │   │
//! │  │   dispatcher ──► reconciliation rules ──► audit trail           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cyclone-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ link_key  │  │ schedule  │  │   event   │  │   │
//! │  │   │Receivable │  │  LinkKey  │  │Installment│  │  Trigger  │  │   │
//! │  │   │ Movement  │  │ idempotent│  │ generator │  │   Event   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   cyclone-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, ledger/stock stores        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Receivable, StockMovement, Installment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`link_key`] - Deterministic linking keys, the idempotency anchor
//! - [`schedule`] - Rental installment schedule generator
//! - [`event`] - Trigger events consumed by the reconciliation engine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Tagged Enums**: Statuses and reasons are enum variants, never loose strings

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod event;
pub mod link_key;
pub mod money;
pub mod schedule;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cyclone_core::Money` instead of
// `use cyclone_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use event::{InstallmentRef, OrderRef, ServiceBilling, StockedLine, TriggerEvent};
pub use link_key::LinkKey;
pub use money::Money;
pub use schedule::{build_schedule, ContractTerms, InstallmentSpec};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted on a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Billing days above this are clamped when a schedule is generated.
///
/// Keeps every month of a contract on a valid calendar day without
/// special-casing February or 30-day months.
pub const MAX_BILLING_DAY: u32 = 28;
