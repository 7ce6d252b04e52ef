//! # cyclone-engine: Reconciliation Engine
//!
//! Keeps the Accounts Receivable ledger and the Inventory ledger consistent
//! with what happens in Sales, Rentals and Service Orders. Producers fire
//! [`TriggerEvent`]s from their save paths; this crate derives the ledger
//! effects, exactly once, in one transaction per event.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Trigger Event                                │
//! │                                                                         │
//! │  engine.dispatch(&event)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate payload ──────────► Err(Guard) - nothing written             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ handlers, in FIXED registration order:                        │     │
//! │  │                                                               │     │
//! │  │  1. receivable-create    4. stock-consume                     │     │
//! │  │  2. receivable-sync      5. stock-return                      │     │
//! │  │  3. receivable-cancel    6. stock-reverse                     │     │
//! │  │                                                               │     │
//! │  │  each returns Vec<Effect>; any Err rolls the WHOLE event back │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  append audit rows (same transaction)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ──► Ok(Vec<Effect>)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - [`engine::ReconciliationEngine`], the public entry point
//! - [`dispatcher`] - Ordered handler execution
//! - [`rules`] - The six reconciliation handlers
//! - [`effect`] - Derived-effect descriptions (returned and audited)
//! - [`queries`] - Read-only reporting surface
//! - [`error`] - Engine error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dispatcher;
pub mod effect;
pub mod engine;
pub mod error;
pub mod queries;
pub mod rules;

// =============================================================================
// Re-exports
// =============================================================================

pub use dispatcher::Dispatcher;
pub use effect::Effect;
pub use engine::ReconciliationEngine;
pub use error::{EngineError, EngineResult};
pub use queries::{Reports, StockImpact};

pub use cyclone_core::TriggerEvent;
