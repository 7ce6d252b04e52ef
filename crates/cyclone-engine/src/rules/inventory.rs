//! # Inventory Rules
//!
//! The three stock-side handlers: consume, return, reverse.
//!
//! ## Guard Asymmetry (deliberate)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sales:          insufficient stock → REJECT the whole event           │
//! │                  (the counter clerk must not promise what isn't there) │
//! │                                                                         │
//! │  Service orders: stock may go NEGATIVE → record + BackorderWarning     │
//! │                  (the technician already put the part in the machine;  │
//! │                   refusing the write would lie about reality)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::effect::Effect;
use crate::error::{EngineError, EngineResult};
use crate::rules::TriggerHandler;
use cyclone_core::{
    MovementDirection, MovementReason, OrderKind, OrderStatus, StockItem, TriggerEvent,
};
use cyclone_db::store::inventory::NewMovement;
use cyclone_db::InventoryStore;

/// Movement reason for consuming stock on behalf of an order kind, or
/// `None` when the kind never moves stock (rentals track equipment
/// per-unit in their own subsystem).
fn consume_reason(kind: OrderKind) -> Option<MovementReason> {
    match kind {
        OrderKind::Sale => Some(MovementReason::Sale),
        OrderKind::ServiceOrder => Some(MovementReason::ServiceUse),
        OrderKind::Rental => None,
    }
}

async fn require_item(conn: &mut SqliteConnection, sku: &str) -> EngineResult<StockItem> {
    InventoryStore::get_by_sku_in(conn, sku)
        .await?
        .ok_or_else(|| EngineError::MissingSku(sku.to_string()))
}

/// Warning effects derived from a post-movement quantity.
fn stock_warnings(item: &StockItem, after: i64) -> Vec<Effect> {
    let mut effects = Vec::new();
    if after < 0 {
        warn!(sku = %item.sku, quantity = after, "Stock went negative (backorder)");
        effects.push(Effect::BackorderWarning {
            sku: item.sku.clone(),
            quantity: after,
        });
    } else if after <= item.minimum_quantity {
        warn!(
            sku = %item.sku,
            quantity = after,
            minimum = item.minimum_quantity,
            "Stock at or below minimum"
        );
        effects.push(Effect::LowStockWarning {
            sku: item.sku.clone(),
            quantity: after,
            minimum: item.minimum_quantity,
        });
    }
    effects
}

// =============================================================================
// Consume on Add
// =============================================================================

/// Records an `out` movement when a stocked line item is added.
pub struct StockConsumeRule;

#[async_trait]
impl TriggerHandler for StockConsumeRule {
    fn name(&self) -> &'static str {
        "stock-consume"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::LineItemCreated {
                order,
                order_status,
                sku,
                ..
            } => {
                sku.is_some()
                    && *order_status != OrderStatus::Cancelled
                    && consume_reason(order.kind).is_some()
            }
            _ => false,
        }
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        let TriggerEvent::LineItemCreated {
            order,
            sku: Some(sku),
            quantity,
            ..
        } = event
        else {
            return Ok(vec![]);
        };

        let Some(reason) = consume_reason(order.kind) else {
            return Ok(vec![]);
        };

        let item = require_item(conn, sku).await?;

        // Sales block; service orders may backorder
        if order.kind == OrderKind::Sale && item.quantity < *quantity {
            return Err(EngineError::InsufficientStock {
                sku: sku.clone(),
                available: item.quantity,
                requested: *quantity,
            });
        }

        let movement = InventoryStore::apply_movement_in(
            conn,
            &NewMovement {
                sku: sku.clone(),
                direction: MovementDirection::Out,
                reason,
                quantity: *quantity,
                unit_cost_cents: item.unit_cost_cents,
                source_kind: Some(order.kind),
                source_id: Some(order.id.clone()),
                cancellation: false,
                note: None,
            },
        )
        .await?;

        debug!(
            sku = %sku,
            delta = movement.delta(),
            stock_after = movement.stock_after,
            "Stock consumed"
        );

        let mut effects = vec![Effect::MovementRecorded {
            sku: sku.clone(),
            delta: movement.delta(),
            stock_after: movement.stock_after,
        }];
        effects.extend(stock_warnings(&item, movement.stock_after));
        Ok(effects)
    }
}

// =============================================================================
// Return on Remove
// =============================================================================

/// Records a compensating `in` movement when a stocked line item is
/// removed on its own (not as part of a parent cancellation).
pub struct StockReturnRule;

#[async_trait]
impl TriggerHandler for StockReturnRule {
    fn name(&self) -> &'static str {
        "stock-return"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::LineItemDeleted {
                order,
                sku,
                parent_cancelling,
                ..
            } => sku.is_some() && !*parent_cancelling && consume_reason(order.kind).is_some(),
            _ => false,
        }
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        let TriggerEvent::LineItemDeleted {
            order,
            sku: Some(sku),
            quantity,
            ..
        } = event
        else {
            return Ok(vec![]);
        };

        let item = require_item(conn, sku).await?;

        let movement = InventoryStore::apply_movement_in(
            conn,
            &NewMovement {
                sku: sku.clone(),
                direction: MovementDirection::In,
                reason: MovementReason::Return,
                quantity: *quantity,
                unit_cost_cents: item.unit_cost_cents,
                source_kind: Some(order.kind),
                source_id: Some(order.id.clone()),
                cancellation: false,
                note: Some("Line item removed".to_string()),
            },
        )
        .await?;

        Ok(vec![Effect::MovementRecorded {
            sku: sku.clone(),
            delta: movement.delta(),
            stock_after: movement.stock_after,
        }])
    }
}

// =============================================================================
// Reverse on Parent Cancel
// =============================================================================

/// Returns every stocked line of a cancelled order, exactly once.
pub struct StockReverseRule;

#[async_trait]
impl TriggerHandler for StockReverseRule {
    fn name(&self) -> &'static str {
        "stock-reverse"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::OrderStatusChanged {
                order,
                new_status,
                lines,
                ..
            } => {
                *new_status == OrderStatus::Cancelled
                    && !lines.is_empty()
                    && consume_reason(order.kind).is_some()
            }
            _ => false,
        }
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        let TriggerEvent::OrderStatusChanged { order, lines, .. } = event else {
            return Ok(vec![]);
        };

        // No-double-reversal guard: a second cancellation of the same
        // order must not inflate stock again.
        if InventoryStore::reversal_exists_in(conn, order.kind, &order.id).await? {
            debug!(order_id = %order.id, "Reversal already recorded, skipping");
            return Ok(vec![Effect::ReversalSkipped {
                source_id: order.id.clone(),
            }]);
        }

        let mut effects = Vec::with_capacity(lines.len());
        for line in lines {
            let item = require_item(conn, &line.sku).await?;

            let movement = InventoryStore::apply_movement_in(
                conn,
                &NewMovement {
                    sku: line.sku.clone(),
                    direction: MovementDirection::In,
                    reason: MovementReason::Return,
                    quantity: line.quantity,
                    unit_cost_cents: item.unit_cost_cents,
                    source_kind: Some(order.kind),
                    source_id: Some(order.id.clone()),
                    cancellation: true,
                    note: Some(format!("{} #{} cancelled", order.kind.label(), order.id)),
                },
            )
            .await?;

            effects.push(Effect::MovementRecorded {
                sku: line.sku.clone(),
                delta: movement.delta(),
                stock_after: movement.stock_after,
            });
        }

        Ok(effects)
    }
}
