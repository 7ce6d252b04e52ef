//! # Dispatcher
//!
//! Runs the reconciliation handlers over one event, in registration
//! order, on a connection the caller already wrapped in a transaction.
//!
//! The dispatcher is deliberately dumb: it doesn't know what the rules
//! do, only that order is fixed and the first error wins.

use sqlx::SqliteConnection;
use tracing::{debug, instrument};

use crate::effect::Effect;
use crate::error::EngineResult;
use crate::rules::{default_rules, TriggerHandler};
use cyclone_core::TriggerEvent;

/// Ordered handler pipeline.
pub struct Dispatcher {
    handlers: Vec<Box<dyn TriggerHandler>>,
}

impl Dispatcher {
    /// Builds the standard pipeline (the six rules, fixed order).
    pub fn new() -> Self {
        Dispatcher {
            handlers: default_rules(),
        }
    }

    /// Builds a pipeline with a custom handler set (tests, extensions).
    /// Order of the vector IS the dispatch order.
    pub fn with_handlers(handlers: Vec<Box<dyn TriggerHandler>>) -> Self {
        Dispatcher { handlers }
    }

    /// Runs every interested handler, collecting their effects.
    ///
    /// The caller owns the transaction around `conn`; an error here means
    /// the caller must roll back.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        let mut effects = Vec::new();

        for handler in &self.handlers {
            if !handler.interested(event) {
                continue;
            }

            debug!(rule = handler.name(), "Applying rule");
            let derived = handler.apply(conn, event).await?;
            debug!(rule = handler.name(), effects = derived.len(), "Rule applied");

            effects.extend(derived);
        }

        Ok(effects)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
