//! # Store Module
//!
//! Database store implementations for Cyclone.
//!
//! ## Store Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Store Pattern Explained                            │
//! │                                                                         │
//! │  Stores isolate SQL behind a clean API, in two flavors:                │
//! │                                                                         │
//! │  Pool reads (reporting, lookups)                                       │
//! │       db.ledger().list_by_debtor("Maria")                              │
//! │       └── &self methods, run on the shared pool                        │
//! │                                                                         │
//! │  Transactional writes (reconciliation)                                 │
//! │       LedgerStore::insert_in(&mut *tx, &entry)                         │
//! │       └── associated fns taking &mut SqliteConnection, so the          │
//! │           ENGINE owns the transaction, not the store                   │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • One trigger event = one transaction, enforced by construction       │
//! │  • SQL is isolated in one place per table                              │
//! │  • Easy to test against an in-memory database                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Stores
//!
//! - [`ledger::LedgerStore`] - Accounts Receivable entries
//! - [`inventory::InventoryStore`] - Stock items and movements
//! - [`installment::InstallmentStore`] - Rental payment schedules
//! - [`audit::AuditStore`] - Derived-effect trace

pub mod audit;
pub mod installment;
pub mod inventory;
pub mod ledger;

use uuid::Uuid;

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
