//! # Reconciliation Rules
//!
//! The six handlers the dispatcher runs, in a FIXED order, for every
//! trigger event.
//!
//! ## Why the Order Is Explicit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The order is data, never an accident of registration:                 │
//! │                                                                         │
//! │   1. receivable-create   entries exist before anything mirrors them    │
//! │   2. receivable-sync     payment state lands on the fresh entry        │
//! │   3. receivable-cancel   cancellation sees the final payment state     │
//! │   4. stock-consume       sale guard can still abort the whole event    │
//! │   5. stock-return        explicit line removal                         │
//! │   6. stock-reverse       parent cancellation, after the ledger side    │
//! │                                                                         │
//! │  Handlers self-select via interested(); a handler that isn't          │
//! │  interested contributes nothing and is skipped.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod inventory;
pub mod receivable;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::effect::Effect;
use crate::error::EngineResult;
use cyclone_core::TriggerEvent;

/// One reconciliation rule.
///
/// `apply` runs inside the dispatcher's transaction; returning an error
/// rolls back everything the event did so far.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Stable rule name (tracing and diagnostics).
    fn name(&self) -> &'static str;

    /// Whether this rule reacts to the event at all.
    fn interested(&self, event: &TriggerEvent) -> bool;

    /// Applies the rule, returning the effects it derived.
    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>>;
}

/// The standard rule set, in dispatch order.
pub fn default_rules() -> Vec<Box<dyn TriggerHandler>> {
    vec![
        Box::new(receivable::ReceivableCreateRule),
        Box::new(receivable::ReceivableSyncRule),
        Box::new(receivable::ReceivableCancelRule),
        Box::new(inventory::StockConsumeRule),
        Box::new(inventory::StockReturnRule),
        Box::new(inventory::StockReverseRule),
    ]
}
