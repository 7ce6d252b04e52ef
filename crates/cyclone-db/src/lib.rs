//! # cyclone-db: Database Layer for Cyclone
//!
//! This crate provides database access for the Cyclone reconciliation engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cyclone Data Flow                                 │
//! │                                                                         │
//! │  Engine rule (receivable-create, stock-consume, ...)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cyclone-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Stores     │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (ledger.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │  inventory.rs,│    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  ...)         │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   receivables │ stock_items │ stock_movements │ installments   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//!
//! Every store exposes two kinds of methods:
//!
//! - **Pool reads** (`&self`, use the internal pool) for reporting and
//!   lookups outside a reconciliation run.
//! - **Transactional writes** (`*_in` associated functions taking
//!   `&mut SqliteConnection`) used by the engine, which owns the single
//!   transaction wrapping one trigger event.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`store`] - Store implementations (ledger, inventory, installment, audit)

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Store re-exports for convenience
pub use store::audit::AuditStore;
pub use store::installment::InstallmentStore;
pub use store::inventory::InventoryStore;
pub use store::ledger::{LedgerStore, LedgerSummary};
