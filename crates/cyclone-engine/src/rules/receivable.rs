//! # Receivable Rules
//!
//! The three ledger-side handlers: create, sync forward, cancel propagate.
//!
//! ## Create + Sync Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InstallmentStatusChanged arrives (maybe re-delivered)                 │
//! │                                                                         │
//! │  create: INSERT if no live entry ── duplicate key? → skip effect       │
//! │  sync:   mirror status/paid fields onto whatever live entry exists     │
//! │                                                                         │
//! │  Running both on every event makes the pair self-healing: a fresh     │
//! │  insert is immediately brought to the event's state, and a            │
//! │  re-delivery degrades to skip + no-change mirror.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::effect::Effect;
use crate::error::EngineResult;
use crate::rules::TriggerHandler;
use cyclone_core::{
    InstallmentStatus, LinkKey, OrderKind, OrderStatus, Receivable, ReceivableStatus,
    ServiceBilling, TriggerEvent,
};
use cyclone_db::store::generate_id;
use cyclone_db::LedgerStore;

// =============================================================================
// Create
// =============================================================================

/// Inserts ledger entries for new installments, completed service orders
/// and completed cash sales. Idempotent on the linking key.
pub struct ReceivableCreateRule;

#[async_trait]
impl TriggerHandler for ReceivableCreateRule {
    fn name(&self) -> &'static str {
        "receivable-create"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::InstallmentStatusChanged { new_status, .. } => {
                *new_status != InstallmentStatus::Cancelled
            }
            TriggerEvent::OrderStatusChanged {
                new_status,
                billing,
                ..
            } => *new_status == OrderStatus::Completed && billing.is_some(),
            _ => false,
        }
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        match event {
            TriggerEvent::InstallmentStatusChanged {
                source,
                debtor,
                total_installments,
                face_amount_cents,
                issued_on,
                due_on,
                new_status,
                paid_amount_cents,
                paid_on,
                payment_method,
            } => {
                let key = LinkKey::for_installment(source.kind, &source.order_id, source.number)?;
                let now = Utc::now();

                let entry = Receivable {
                    id: generate_id(),
                    link_key: key.to_string(),
                    description: format!(
                        "{} #{} - installment {}/{}",
                        source.kind.label(),
                        source.order_id,
                        source.number,
                        total_installments
                    ),
                    debtor: debtor.clone(),
                    source_kind: source.kind,
                    source_id: source.order_id.clone(),
                    amount_cents: *face_amount_cents,
                    issued_on: *issued_on,
                    due_on: *due_on,
                    status: new_status.as_receivable_status(),
                    paid_amount_cents: *paid_amount_cents,
                    paid_on: *paid_on,
                    payment_method: *payment_method,
                    note: None,
                    created_at: now,
                    updated_at: now,
                };

                let inserted = LedgerStore::insert_in(conn, &entry).await?;
                Ok(vec![if inserted {
                    Effect::ReceivableCreated {
                        link_key: entry.link_key,
                        amount_cents: entry.amount_cents,
                    }
                } else {
                    Effect::ReceivableSkipped {
                        link_key: entry.link_key,
                    }
                }])
            }

            TriggerEvent::OrderStatusChanged {
                order,
                billing: Some(billing),
                ..
            } => {
                let Some((key, description)) = billing_target(order.kind, &order.id, billing)?
                else {
                    debug!(order_id = %order.id, "Billing below threshold, no entry");
                    return Ok(vec![]);
                };

                let now = Utc::now();
                let paid = billing.paid_amount_cents.is_some();

                let entry = Receivable {
                    id: generate_id(),
                    link_key: key.to_string(),
                    description,
                    debtor: billing.debtor.clone(),
                    source_kind: order.kind,
                    source_id: order.id.clone(),
                    amount_cents: billing.total_cents,
                    issued_on: billing.issued_on,
                    due_on: billing.issued_on,
                    status: if paid {
                        ReceivableStatus::Paid
                    } else {
                        ReceivableStatus::Pending
                    },
                    paid_amount_cents: billing.paid_amount_cents,
                    paid_on: billing.paid_on,
                    payment_method: billing.payment_method,
                    note: None,
                    created_at: now,
                    updated_at: now,
                };

                let inserted = LedgerStore::insert_in(conn, &entry).await?;
                Ok(vec![if inserted {
                    Effect::ReceivableCreated {
                        link_key: entry.link_key,
                        amount_cents: entry.amount_cents,
                    }
                } else {
                    Effect::ReceivableSkipped {
                        link_key: entry.link_key,
                    }
                }])
            }

            _ => Ok(vec![]),
        }
    }
}

/// Resolves the linking key and description for an order-level billing,
/// or `None` when the billing does not produce an entry.
///
/// Service guards: warranty work and zero totals never hit the ledger.
/// Rentals bill through installments, not order completion.
fn billing_target(
    kind: OrderKind,
    order_id: &str,
    billing: &ServiceBilling,
) -> EngineResult<Option<(LinkKey, String)>> {
    if billing.under_warranty || billing.total_cents <= 0 {
        return Ok(None);
    }

    match kind {
        OrderKind::ServiceOrder => Ok(Some((
            LinkKey::for_service_order(order_id)?,
            format!("Service order #{}", order_id),
        ))),
        // Cash sale without an installment plan
        OrderKind::Sale => Ok(Some((
            LinkKey::for_direct_sale(order_id)?,
            format!("Sale #{}", order_id),
        ))),
        OrderKind::Rental => Ok(None),
    }
}

// =============================================================================
// Sync Forward
// =============================================================================

/// Mirrors installment payment state onto the live ledger entry.
/// One-way: the ledger never writes back to the source.
pub struct ReceivableSyncRule;

#[async_trait]
impl TriggerHandler for ReceivableSyncRule {
    fn name(&self) -> &'static str {
        "receivable-sync"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        matches!(
            event,
            TriggerEvent::InstallmentStatusChanged { new_status, .. }
                if *new_status != InstallmentStatus::Cancelled
        )
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        let TriggerEvent::InstallmentStatusChanged {
            source,
            new_status,
            paid_amount_cents,
            paid_on,
            payment_method,
            ..
        } = event
        else {
            return Ok(vec![]);
        };

        let key = LinkKey::for_installment(source.kind, &source.order_id, source.number)?;
        let status = new_status.as_receivable_status();

        let synced = LedgerStore::sync_payment_in(
            conn,
            &key.to_string(),
            status,
            *paid_amount_cents,
            *paid_on,
            *payment_method,
        )
        .await?;

        if synced {
            Ok(vec![Effect::ReceivableSynced {
                link_key: key.to_string(),
                status,
            }])
        } else {
            // No live entry: create was skipped AND history is cancelled.
            // Nothing to mirror onto.
            debug!(link_key = %key, "No live entry to sync");
            Ok(vec![])
        }
    }
}

// =============================================================================
// Cancel Propagate
// =============================================================================

/// Cancels open ledger entries when their source is cancelled.
/// Paid entries are never touched: received money is history.
pub struct ReceivableCancelRule;

#[async_trait]
impl TriggerHandler for ReceivableCancelRule {
    fn name(&self) -> &'static str {
        "receivable-cancel"
    }

    fn interested(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::InstallmentStatusChanged { new_status, .. } => {
                *new_status == InstallmentStatus::Cancelled
            }
            TriggerEvent::OrderStatusChanged { new_status, .. } => {
                *new_status == OrderStatus::Cancelled
            }
            _ => false,
        }
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        event: &TriggerEvent,
    ) -> EngineResult<Vec<Effect>> {
        match event {
            TriggerEvent::InstallmentStatusChanged { source, .. } => {
                let key = LinkKey::for_installment(source.kind, &source.order_id, source.number)?;

                let cancelled =
                    LedgerStore::cancel_open_in(conn, &key.to_string(), "Source installment cancelled")
                        .await?;

                Ok(if cancelled {
                    vec![Effect::ReceivableCancelled {
                        link_key: key.to_string(),
                    }]
                } else {
                    vec![]
                })
            }

            TriggerEvent::OrderStatusChanged { order, .. } => {
                let count = LedgerStore::cancel_open_for_source_in(
                    conn,
                    order.kind,
                    &order.id,
                    &format!("{} #{} cancelled", order.kind.label(), order.id),
                )
                .await?;

                Ok(if count > 0 {
                    vec![Effect::ReceivablesCancelled {
                        source_id: order.id.clone(),
                        count,
                    }]
                } else {
                    vec![]
                })
            }

            _ => Ok(vec![]),
        }
    }
}
