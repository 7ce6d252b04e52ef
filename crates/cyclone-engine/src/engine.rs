//! # Reconciliation Engine
//!
//! The public entry point. Producers construct one engine at startup and
//! call [`ReconciliationEngine::dispatch`] from their save paths; contract
//! activation and the overdue sweep are first-class operations of their
//! own because they originate here, not in a producer.
//!
//! ## Transactionality
//! Every operation on this type is all-or-nothing: one SQLite transaction
//! wraps the handlers AND the audit rows, so a partially-applied event
//! cannot be observed, ever. An error return means nothing was written.

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::effect::Effect;
use crate::error::{EngineError, EngineResult};
use cyclone_core::validation::{
    validate_amount_cents, validate_debtor, validate_payment_amount, validate_quantity,
    validate_sku, validate_source_id,
};
use cyclone_core::{
    build_schedule, ContractTerms, InstallmentStatus, LinkKey, OrderKind, PaymentMethod,
    Receivable, ReceivableStatus, StockedLine, TriggerEvent,
};
use cyclone_db::store::generate_id;
use cyclone_db::{AuditStore, Database, DbError, InstallmentStore, LedgerStore};

/// The reconciliation engine.
///
/// Cheap to clone (the database handle is a pool handle).
#[derive(Clone)]
pub struct ReconciliationEngine {
    db: Database,
    dispatcher: std::sync::Arc<Dispatcher>,
}

impl ReconciliationEngine {
    /// Creates an engine over an initialized database, with the standard
    /// rule pipeline.
    pub fn new(db: Database) -> Self {
        ReconciliationEngine {
            db,
            dispatcher: std::sync::Arc::new(Dispatcher::new()),
        }
    }

    /// Creates an engine with a custom dispatcher (tests, extensions).
    pub fn with_dispatcher(db: Database, dispatcher: Dispatcher) -> Self {
        ReconciliationEngine {
            db,
            dispatcher: std::sync::Arc::new(dispatcher),
        }
    }

    /// The underlying database handle (reporting, stores).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Applies one trigger event: validate, run the rules in order inside
    /// one transaction, append audit rows, commit.
    ///
    /// ## Returns
    /// The derived effects. Idempotent no-ops show up as skip effects,
    /// not errors.
    ///
    /// ## Errors
    /// Any error means the transaction was rolled back and the producer
    /// must reject its own save (fail closed).
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn dispatch(&self, event: &TriggerEvent) -> EngineResult<Vec<Effect>> {
        validate_event(event)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let effects = self.dispatcher.run(&mut tx, event).await?;

        for effect in &effects {
            AuditStore::append_in(
                &mut tx,
                effect.kind(),
                effect.link_key(),
                effect.sku(),
                &effect.detail(),
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(event = event.name(), effects = effects.len(), "Event reconciled");
        Ok(effects)
    }

    // =========================================================================
    // Contract Activation
    // =========================================================================

    /// Activates (or re-activates) a rental contract: builds the full
    /// schedule, discards regenerable pending installments, inserts the
    /// missing numbers and creates their ledger entries.
    ///
    /// ## Re-activation Semantics
    /// - Pending installments are deleted and their live receivables
    ///   cancelled (the schedule may have changed underneath them)
    /// - Paid/overdue/cancelled installments are history and survive
    /// - Only schedule numbers not already present are inserted
    ///
    /// Activating twice in a row is therefore observationally idempotent.
    #[instrument(skip_all, fields(contract_id = %terms.contract_id))]
    pub async fn activate_contract(&self, terms: &ContractTerms) -> EngineResult<Vec<Effect>> {
        validate_debtor(&terms.debtor)?;
        let schedule = build_schedule(terms)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let mut effects = Vec::new();

        // Discard regenerable installments and the entries backing them
        let dropped = InstallmentStore::delete_pending_in(&mut tx, &terms.contract_id).await?;
        for inst in &dropped {
            let key =
                LinkKey::for_installment(OrderKind::Rental, &terms.contract_id, inst.number)?;
            if LedgerStore::cancel_open_in(&mut tx, &key.to_string(), "Contract re-activated")
                .await?
            {
                effects.push(Effect::ReceivableCancelled {
                    link_key: key.to_string(),
                });
            }
        }
        if !dropped.is_empty() {
            effects.push(Effect::InstallmentsDiscarded {
                contract_id: terms.contract_id.clone(),
                count: dropped.len(),
            });
        }

        // Insert only the numbers not already present (paid history stays)
        let existing = InstallmentStore::existing_numbers_in(&mut tx, &terms.contract_id).await?;
        let missing: Vec<_> = schedule
            .iter()
            .filter(|s| !existing.contains(&s.number))
            .cloned()
            .collect();

        let created =
            InstallmentStore::insert_batch_in(&mut tx, &terms.contract_id, &missing).await?;

        let total = schedule.len();
        for inst in &created {
            let key =
                LinkKey::for_installment(OrderKind::Rental, &terms.contract_id, inst.number)?;
            let now = Utc::now();

            let entry = Receivable {
                id: generate_id(),
                link_key: key.to_string(),
                description: format!(
                    "Rental #{} - installment {}/{}",
                    terms.contract_id, inst.number, total
                ),
                debtor: terms.debtor.clone(),
                source_kind: OrderKind::Rental,
                source_id: terms.contract_id.clone(),
                amount_cents: inst.amount_cents,
                issued_on: terms.start_date,
                due_on: inst.due_on,
                status: ReceivableStatus::Pending,
                paid_amount_cents: None,
                paid_on: None,
                payment_method: None,
                note: None,
                created_at: now,
                updated_at: now,
            };

            effects.push(if LedgerStore::insert_in(&mut tx, &entry).await? {
                Effect::ReceivableCreated {
                    link_key: entry.link_key,
                    amount_cents: entry.amount_cents,
                }
            } else {
                Effect::ReceivableSkipped {
                    link_key: entry.link_key,
                }
            });
        }

        effects.push(Effect::InstallmentsGenerated {
            contract_id: terms.contract_id.clone(),
            count: created.len(),
        });

        for effect in &effects {
            AuditStore::append_in(
                &mut tx,
                effect.kind(),
                effect.link_key(),
                effect.sku(),
                &effect.detail(),
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            contract_id = %terms.contract_id,
            discarded = dropped.len(),
            generated = created.len(),
            "Contract activated"
        );
        Ok(effects)
    }

    /// Marks a stored installment paid and mirrors the payment onto the
    /// ledger, in one transaction.
    #[instrument(skip_all, fields(contract_id = %contract_id, number = number))]
    pub async fn record_installment_payment(
        &self,
        contract_id: &str,
        number: i64,
        paid_amount_cents: i64,
        paid_on: NaiveDate,
        payment_method: PaymentMethod,
    ) -> EngineResult<Vec<Effect>> {
        validate_source_id(contract_id)?;
        validate_payment_amount(paid_amount_cents)?;

        let key = LinkKey::for_installment(OrderKind::Rental, contract_id, number)?;
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let updated = InstallmentStore::set_status_in(
            &mut tx,
            contract_id,
            number,
            InstallmentStatus::Paid,
            Some(paid_amount_cents),
            Some(paid_on),
            Some(payment_method),
        )
        .await?;
        if !updated {
            return Err(EngineError::MissingSource(format!(
                "installment {}#{}",
                contract_id, number
            )));
        }

        let mut effects = Vec::new();
        if LedgerStore::sync_payment_in(
            &mut tx,
            &key.to_string(),
            ReceivableStatus::Paid,
            Some(paid_amount_cents),
            Some(paid_on),
            Some(payment_method),
        )
        .await?
        {
            effects.push(Effect::ReceivableSynced {
                link_key: key.to_string(),
                status: ReceivableStatus::Paid,
            });
        }

        for effect in &effects {
            AuditStore::append_in(
                &mut tx,
                effect.kind(),
                effect.link_key(),
                effect.sku(),
                &effect.detail(),
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(effects)
    }

    // =========================================================================
    // Overdue Sweep
    // =========================================================================

    /// Flips pending installments and receivables past their due date to
    /// overdue, as of the given date.
    ///
    /// Run this from a scheduler (daily) or before reporting.
    #[instrument(skip(self))]
    pub async fn mark_overdue(&self, as_of: NaiveDate) -> EngineResult<Vec<Effect>> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let installments = InstallmentStore::mark_overdue_in(&mut tx, as_of).await?;
        let receivables = LedgerStore::mark_overdue_in(&mut tx, as_of).await?;

        let effect = Effect::OverdueMarked {
            installments: installments.len() as u64,
            receivables,
        };
        AuditStore::append_in(&mut tx, effect.kind(), None, None, &effect.detail()).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            installments = installments.len(),
            receivables = receivables,
            "Overdue sweep complete"
        );
        Ok(vec![effect])
    }

    // =========================================================================
    // Advisory Checks
    // =========================================================================

    /// Checks whether a prospective sale could be reconciled, without
    /// writing anything. Returns the same guard errors `dispatch` would.
    pub async fn check_sale_availability(&self, lines: &[StockedLine]) -> EngineResult<()> {
        for line in lines {
            validate_sku(&line.sku)?;
            validate_quantity(line.quantity)?;

            let item = self
                .db
                .inventory()
                .get_by_sku(&line.sku)
                .await?
                .ok_or_else(|| EngineError::MissingSku(line.sku.clone()))?;

            if item.quantity < line.quantity {
                return Err(EngineError::InsufficientStock {
                    sku: line.sku.clone(),
                    available: item.quantity,
                    requested: line.quantity,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Event Validation
// =============================================================================

/// Validates an event payload before any transaction is opened.
fn validate_event(event: &TriggerEvent) -> EngineResult<()> {
    match event {
        TriggerEvent::LineItemCreated {
            order,
            sku,
            quantity,
            unit_price_cents,
            ..
        }
        | TriggerEvent::LineItemDeleted {
            order,
            sku,
            quantity,
            unit_price_cents,
            ..
        } => {
            validate_source_id(&order.id)?;
            if let Some(sku) = sku {
                validate_sku(sku)?;
                validate_quantity(*quantity)?;
            }
            validate_amount_cents(*unit_price_cents)?;
        }

        TriggerEvent::InstallmentStatusChanged {
            source,
            debtor,
            total_installments,
            face_amount_cents,
            paid_amount_cents,
            ..
        } => {
            validate_source_id(&source.order_id)?;
            validate_debtor(debtor)?;
            validate_amount_cents(*face_amount_cents)?;
            if source.number < 1 || *total_installments < source.number {
                return Err(EngineError::Guard(format!(
                    "installment {} outside plan of {}",
                    source.number, total_installments
                )));
            }
            if let Some(paid) = paid_amount_cents {
                validate_payment_amount(*paid)?;
            }
        }

        TriggerEvent::OrderStatusChanged {
            order,
            billing,
            lines,
            ..
        } => {
            validate_source_id(&order.id)?;
            if let Some(billing) = billing {
                validate_debtor(&billing.debtor)?;
                validate_amount_cents(billing.total_cents)?;
            }
            for line in lines {
                validate_sku(&line.sku)?;
                validate_quantity(line.quantity)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cyclone_core::{InstallmentRef, OrderRef, OrderStatus, ServiceBilling, StockItem};
    use cyclone_db::DbConfig;

    async fn engine() -> ReconciliationEngine {
        let db = Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database");
        ReconciliationEngine::new(db)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    async fn seed_item(engine: &ReconciliationEngine, sku: &str, quantity: i64, minimum: i64) {
        let now = Utc::now();
        engine
            .db()
            .inventory()
            .insert_item(&StockItem {
                sku: sku.to_string(),
                name: format!("Test item {sku}"),
                quantity,
                minimum_quantity: minimum,
                unit_cost_cents: 4_500,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert item");
    }

    fn installment_event(
        kind: OrderKind,
        order_id: &str,
        number: i64,
        total: i64,
        status: InstallmentStatus,
    ) -> TriggerEvent {
        TriggerEvent::InstallmentStatusChanged {
            source: InstallmentRef {
                kind,
                order_id: order_id.to_string(),
                number,
            },
            debtor: "Dyson Ltda".to_string(),
            total_installments: total,
            face_amount_cents: 10_000,
            issued_on: date(2025, 1, 10),
            due_on: date(2025, 2, 10),
            new_status: status,
            paid_amount_cents: None,
            paid_on: None,
            payment_method: None,
        }
    }

    fn line_created(kind: OrderKind, order_id: &str, sku: &str, quantity: i64) -> TriggerEvent {
        TriggerEvent::LineItemCreated {
            order: OrderRef::new(kind, order_id),
            order_status: OrderStatus::Open,
            sku: Some(sku.to_string()),
            quantity,
            unit_price_cents: 9_900,
        }
    }

    fn terms(contract_id: &str, months: u32) -> ContractTerms {
        ContractTerms {
            contract_id: contract_id.to_string(),
            debtor: "Hotel Miramar".to_string(),
            start_date: date(2025, 1, 10),
            term_months: months,
            monthly_amount_cents: 10_000,
            billing_day: 10,
        }
    }

    // =========================================================================
    // Receivable lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_installment_event_creates_receivable() {
        let engine = engine().await;
        let event = installment_event(OrderKind::Sale, "V-101", 2, 4, InstallmentStatus::Pending);

        let effects = engine.dispatch(&event).await.unwrap();
        assert!(matches!(effects[0], Effect::ReceivableCreated { .. }));

        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("SALE-V-101-2")
            .await
            .unwrap()
            .expect("entry created");
        assert_eq!(entry.description, "Sale #V-101 - installment 2/4");
        assert_eq!(entry.amount_cents, 10_000);
        assert_eq!(entry.status, ReceivableStatus::Pending);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_a_noop() {
        let engine = engine().await;
        let event = installment_event(OrderKind::Sale, "V-101", 1, 1, InstallmentStatus::Pending);

        engine.dispatch(&event).await.unwrap();
        let effects = engine.dispatch(&event).await.unwrap();

        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReceivableSkipped { .. })));
        assert_eq!(engine.db().ledger().count_live().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_payment_event_syncs_ledger() {
        let engine = engine().await;
        engine
            .dispatch(&installment_event(
                OrderKind::Sale,
                "V-200",
                1,
                1,
                InstallmentStatus::Pending,
            ))
            .await
            .unwrap();

        let mut paid = installment_event(OrderKind::Sale, "V-200", 1, 1, InstallmentStatus::Paid);
        if let TriggerEvent::InstallmentStatusChanged {
            paid_amount_cents,
            paid_on,
            payment_method,
            ..
        } = &mut paid
        {
            *paid_amount_cents = Some(10_000);
            *paid_on = Some(date(2025, 2, 8));
            *payment_method = Some(PaymentMethod::Pix);
        }
        engine.dispatch(&paid).await.unwrap();

        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("SALE-V-200-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, ReceivableStatus::Paid);
        assert_eq!(entry.paid_amount_cents, Some(10_000));
        assert_eq!(entry.payment_method, Some(PaymentMethod::Pix));
    }

    #[tokio::test]
    async fn test_cancelling_order_spares_paid_entries() {
        let engine = engine().await;
        engine
            .dispatch(&installment_event(
                OrderKind::Sale,
                "V-300",
                1,
                2,
                InstallmentStatus::Paid,
            ))
            .await
            .unwrap();
        engine
            .dispatch(&installment_event(
                OrderKind::Sale,
                "V-300",
                2,
                2,
                InstallmentStatus::Pending,
            ))
            .await
            .unwrap();

        let effects = engine
            .dispatch(&TriggerEvent::OrderStatusChanged {
                order: OrderRef::new(OrderKind::Sale, "V-300"),
                new_status: OrderStatus::Cancelled,
                billing: None,
                lines: Vec::new(),
            })
            .await
            .unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReceivablesCancelled { count: 1, .. })));

        let first = engine
            .db()
            .ledger()
            .get_live_by_link_key("SALE-V-300-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, ReceivableStatus::Paid);
        assert!(engine
            .db()
            .ledger()
            .get_live_by_link_key("SALE-V-300-2")
            .await
            .unwrap()
            .is_none());
    }

    // =========================================================================
    // Service billing
    // =========================================================================

    fn completed_service(order_id: &str, billing: ServiceBilling) -> TriggerEvent {
        TriggerEvent::OrderStatusChanged {
            order: OrderRef::new(OrderKind::ServiceOrder, order_id),
            new_status: OrderStatus::Completed,
            billing: Some(billing),
            lines: Vec::new(),
        }
    }

    fn billing(total_cents: i64) -> ServiceBilling {
        ServiceBilling {
            debtor: "Condominio Azul".to_string(),
            total_cents,
            under_warranty: false,
            issued_on: date(2025, 3, 1),
            paid_amount_cents: None,
            paid_on: None,
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_completed_service_order_bills_once() {
        let engine = engine().await;
        let event = completed_service("OS-9", billing(25_000));

        let effects = engine.dispatch(&event).await.unwrap();
        assert!(matches!(effects[0], Effect::ReceivableCreated { .. }));

        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("SERVICE-OS-9")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.description, "Service order #OS-9");
        assert_eq!(entry.due_on, date(2025, 3, 1));

        // completion re-saved: no second entry
        let effects = engine.dispatch(&event).await.unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReceivableSkipped { .. })));
        assert_eq!(engine.db().ledger().count_live().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_warranty_and_zero_total_bill_nothing() {
        let engine = engine().await;

        let mut warranty = billing(25_000);
        warranty.under_warranty = true;
        engine
            .dispatch(&completed_service("OS-10", warranty))
            .await
            .unwrap();
        engine
            .dispatch(&completed_service("OS-11", billing(0)))
            .await
            .unwrap();

        assert_eq!(engine.db().ledger().count_live().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prepaid_service_order_lands_as_paid() {
        let engine = engine().await;
        let mut paid = billing(18_000);
        paid.paid_amount_cents = Some(18_000);
        paid.paid_on = Some(date(2025, 3, 1));
        paid.payment_method = Some(PaymentMethod::Card);

        engine
            .dispatch(&completed_service("OS-12", paid))
            .await
            .unwrap();

        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("SERVICE-OS-12")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, ReceivableStatus::Paid);
        assert_eq!(entry.paid_amount_cents, Some(18_000));
    }

    #[tokio::test]
    async fn test_direct_cash_sale_receivable() {
        let engine = engine().await;
        let mut receipt = billing(32_900);
        receipt.paid_amount_cents = Some(32_900);
        receipt.paid_on = Some(date(2025, 3, 5));
        receipt.payment_method = Some(PaymentMethod::Cash);

        engine
            .dispatch(&TriggerEvent::OrderStatusChanged {
                order: OrderRef::new(OrderKind::Sale, "V-42"),
                new_status: OrderStatus::Completed,
                billing: Some(receipt),
                lines: Vec::new(),
            })
            .await
            .unwrap();

        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("SALE-V-42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.description, "Sale #V-42");
        assert_eq!(entry.status, ReceivableStatus::Paid);
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    #[tokio::test]
    async fn test_sale_line_consumes_stock() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 10, 3).await;

        let effects = engine
            .dispatch(&line_created(OrderKind::Sale, "V-500", "VAC-T850", 4))
            .await
            .unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::MovementRecorded { delta: -4, stock_after: 6, .. })));

        let item = engine
            .db()
            .inventory()
            .get_by_sku("VAC-T850")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 6);
    }

    #[tokio::test]
    async fn test_sale_blocks_on_insufficient_stock() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 2, 0).await;

        let err = engine
            .dispatch(&line_created(OrderKind::Sale, "V-501", "VAC-T850", 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));

        // rejection rolled everything back
        let item = engine
            .db()
            .inventory()
            .get_by_sku("VAC-T850")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 2);
        assert!(engine
            .db()
            .inventory()
            .history("VAC-T850", 10)
            .await
            .unwrap()
            .is_empty());
        assert!(engine.db().audit().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_order_may_backorder() {
        let engine = engine().await;
        seed_item(&engine, "FLT-HEPA", 1, 2).await;

        let effects = engine
            .dispatch(&line_created(OrderKind::ServiceOrder, "OS-20", "FLT-HEPA", 3))
            .await
            .unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::BackorderWarning { quantity: -2, .. })));

        let item = engine
            .db()
            .inventory()
            .get_by_sku("FLT-HEPA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, -2);
    }

    #[tokio::test]
    async fn test_rental_lines_never_touch_stock() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 5, 0).await;

        let effects = engine
            .dispatch(&line_created(OrderKind::Rental, "C-900", "VAC-T850", 2))
            .await
            .unwrap();
        assert!(effects.is_empty());

        let item = engine
            .db()
            .inventory()
            .get_by_sku("VAC-T850")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 5);
    }

    #[tokio::test]
    async fn test_line_added_to_cancelled_parent_is_ignored() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 5, 0).await;

        let effects = engine
            .dispatch(&TriggerEvent::LineItemCreated {
                order: OrderRef::new(OrderKind::Sale, "V-502"),
                order_status: OrderStatus::Cancelled,
                sku: Some("VAC-T850".to_string()),
                quantity: 2,
                unit_price_cents: 9_900,
            })
            .await
            .unwrap();
        assert!(effects.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_line_returns_stock() {
        let engine = engine().await;
        seed_item(&engine, "BAG-UNI", 10, 2).await;

        engine
            .dispatch(&line_created(OrderKind::Sale, "V-503", "BAG-UNI", 3))
            .await
            .unwrap();
        engine
            .dispatch(&TriggerEvent::LineItemDeleted {
                order: OrderRef::new(OrderKind::Sale, "V-503"),
                sku: Some("BAG-UNI".to_string()),
                quantity: 3,
                unit_price_cents: 9_900,
                parent_cancelling: false,
            })
            .await
            .unwrap();

        let item = engine
            .db()
            .inventory()
            .get_by_sku("BAG-UNI")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 10);
    }

    #[tokio::test]
    async fn test_line_delete_inside_parent_cancel_reverses_once() {
        // Deleting a line as part of cancelling its parent must not stack
        // a return on top of the cancel rule's reversal: one compensating
        // movement total for the order.
        let engine = engine().await;
        seed_item(&engine, "PRT-BELT", 10, 2).await;

        engine
            .dispatch(&line_created(OrderKind::Sale, "V-700", "PRT-BELT", 3))
            .await
            .unwrap();

        // the cancel rule owns this reversal; the delete records nothing
        let effects = engine
            .dispatch(&TriggerEvent::LineItemDeleted {
                order: OrderRef::new(OrderKind::Sale, "V-700"),
                sku: Some("PRT-BELT".to_string()),
                quantity: 3,
                unit_price_cents: 9_900,
                parent_cancelling: true,
            })
            .await
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("PRT-BELT")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            7
        );

        engine
            .dispatch(&TriggerEvent::OrderStatusChanged {
                order: OrderRef::new(OrderKind::Sale, "V-700"),
                new_status: OrderStatus::Cancelled,
                billing: None,
                lines: vec![StockedLine {
                    sku: "PRT-BELT".to_string(),
                    quantity: 3,
                    unit_price_cents: 9_900,
                }],
            })
            .await
            .unwrap();
        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("PRT-BELT")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            10
        );

        let movements = engine
            .db()
            .inventory()
            .movements_for_source(OrderKind::Sale, "V-700")
            .await
            .unwrap();
        let returns: Vec<_> = movements
            .iter()
            .filter(|m| m.direction == cyclone_core::MovementDirection::In)
            .collect();
        assert_eq!(returns.len(), 1);
        assert!(returns[0].cancellation);
    }

    #[tokio::test]
    async fn test_journal_sums_to_live_counter() {
        // Conservation across a mixed sequence: the seeded quantity plus
        // the signed journal must equal the live counter at every rest.
        let engine = engine().await;
        seed_item(&engine, "FLT-HEPA", 20, 2).await;

        engine
            .dispatch(&line_created(OrderKind::Sale, "V-800", "FLT-HEPA", 5))
            .await
            .unwrap();
        engine
            .dispatch(&line_created(OrderKind::ServiceOrder, "OS-800", "FLT-HEPA", 3))
            .await
            .unwrap();
        engine
            .dispatch(&TriggerEvent::LineItemDeleted {
                order: OrderRef::new(OrderKind::Sale, "V-800"),
                sku: Some("FLT-HEPA".to_string()),
                quantity: 2,
                unit_price_cents: 3_500,
                parent_cancelling: false,
            })
            .await
            .unwrap();
        engine
            .dispatch(&TriggerEvent::OrderStatusChanged {
                order: OrderRef::new(OrderKind::ServiceOrder, "OS-800"),
                new_status: OrderStatus::Cancelled,
                billing: None,
                lines: vec![StockedLine {
                    sku: "FLT-HEPA".to_string(),
                    quantity: 3,
                    unit_price_cents: 3_500,
                }],
            })
            .await
            .unwrap();

        let journal: i64 = engine
            .db()
            .inventory()
            .history("FLT-HEPA", 50)
            .await
            .unwrap()
            .iter()
            .map(|m| m.delta())
            .sum();
        let item = engine
            .db()
            .inventory()
            .get_by_sku("FLT-HEPA")
            .await
            .unwrap()
            .unwrap();

        // 20 - 5 - 3 + 2 + 3
        assert_eq!(item.quantity, 17);
        assert_eq!(20 + journal, item.quantity);
    }

    #[tokio::test]
    async fn test_cancelled_service_order_restores_stock_exactly_once() {
        // Walkthrough: FILTER-X at 10, order OS-7 uses 2, order is
        // cancelled before completion. Stock 10 -> 8 -> 10, no receivable
        // at any point, and a second cancel delivery changes nothing.
        let engine = engine().await;
        seed_item(&engine, "FILTER-X", 10, 2).await;

        engine
            .dispatch(&line_created(OrderKind::ServiceOrder, "OS-7", "FILTER-X", 2))
            .await
            .unwrap();
        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("FILTER-X")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            8
        );

        let cancel = TriggerEvent::OrderStatusChanged {
            order: OrderRef::new(OrderKind::ServiceOrder, "OS-7"),
            new_status: OrderStatus::Cancelled,
            billing: None,
            lines: vec![StockedLine {
                sku: "FILTER-X".to_string(),
                quantity: 2,
                unit_price_cents: 3_500,
            }],
        };
        let effects = engine.dispatch(&cancel).await.unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::MovementRecorded { delta: 2, .. })));
        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("FILTER-X")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            10
        );

        // redelivered cancellation: guarded, stock untouched
        let effects = engine.dispatch(&cancel).await.unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReversalSkipped { .. })));
        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("FILTER-X")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            10
        );

        assert_eq!(engine.db().ledger().count_live().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_sku_fails_whole_event() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 5, 0).await;

        // first line is fine, second references a missing item; the
        // reversal must not half-apply
        let err = engine
            .dispatch(&TriggerEvent::OrderStatusChanged {
                order: OrderRef::new(OrderKind::Sale, "V-504"),
                new_status: OrderStatus::Cancelled,
                billing: None,
                lines: vec![
                    StockedLine {
                        sku: "VAC-T850".to_string(),
                        quantity: 1,
                        unit_price_cents: 9_900,
                    },
                    StockedLine {
                        sku: "GHOST-1".to_string(),
                        quantity: 1,
                        unit_price_cents: 9_900,
                    },
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingSku(_)));

        assert_eq!(
            engine
                .db()
                .inventory()
                .get_by_sku("VAC-T850")
                .await
                .unwrap()
                .unwrap()
                .quantity,
            5
        );
    }

    // =========================================================================
    // Contract activation
    // =========================================================================

    #[tokio::test]
    async fn test_contract_activation_walkthrough() {
        // Walkthrough: 3-month contract from 2025-01-10 at 100.00/month.
        // Activation yields 3 installments and 3 pending receivables;
        // paying #1 flips both sides; re-activation discards only the
        // still-pending tail and leaves the paid history alone.
        let engine = engine().await;
        let terms = terms("C-17", 3);

        let effects = engine.activate_contract(&terms).await.unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::InstallmentsGenerated { count: 3, .. })));

        let plan = engine.db().installments().list_for_contract("C-17").await.unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].due_on, date(2025, 1, 10));
        assert_eq!(plan[1].due_on, date(2025, 2, 10));
        assert_eq!(plan[2].due_on, date(2025, 3, 10));
        assert_eq!(plan[0].reference, "01/2025");

        assert_eq!(engine.db().ledger().count_live().await.unwrap(), 3);
        let first = engine
            .db()
            .ledger()
            .get_live_by_link_key("RENTAL-C-17-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.description, "Rental #C-17 - installment 1/3");
        assert_eq!(first.amount_cents, 10_000);

        engine
            .record_installment_payment("C-17", 1, 10_000, date(2025, 1, 12), PaymentMethod::Pix)
            .await
            .unwrap();
        let first = engine
            .db()
            .ledger()
            .get_live_by_link_key("RENTAL-C-17-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, ReceivableStatus::Paid);
        assert_eq!(first.paid_on, Some(date(2025, 1, 12)));

        // amend: re-activate with the same terms
        let effects = engine.activate_contract(&terms).await.unwrap();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::InstallmentsDiscarded { count: 2, .. })));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::InstallmentsGenerated { count: 2, .. })));

        let plan = engine.db().installments().list_for_contract("C-17").await.unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].status, InstallmentStatus::Paid);

        let first = engine
            .db()
            .ledger()
            .get_live_by_link_key("RENTAL-C-17-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, ReceivableStatus::Paid);
    }

    #[tokio::test]
    async fn test_billing_day_clamps_to_28() {
        let engine = engine().await;
        let terms = ContractTerms {
            contract_id: "C-31".to_string(),
            debtor: "Hotel Miramar".to_string(),
            start_date: date(2025, 1, 31),
            term_months: 3,
            monthly_amount_cents: 10_000,
            billing_day: 31,
        };

        engine.activate_contract(&terms).await.unwrap();
        let plan = engine.db().installments().list_for_contract("C-31").await.unwrap();
        assert_eq!(plan[0].due_on, date(2025, 1, 28));
        assert_eq!(plan[1].due_on, date(2025, 2, 28));
        assert_eq!(plan[2].due_on, date(2025, 3, 28));
    }

    #[tokio::test]
    async fn test_payment_for_unknown_installment_is_an_error() {
        let engine = engine().await;
        let err = engine
            .record_installment_payment("C-404", 1, 10_000, date(2025, 1, 12), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingSource(_)));
    }

    // =========================================================================
    // Overdue sweep
    // =========================================================================

    #[tokio::test]
    async fn test_overdue_sweep_flips_both_sides() {
        let engine = engine().await;
        engine.activate_contract(&terms("C-18", 2)).await.unwrap();

        let effects = engine.mark_overdue(date(2025, 2, 15)).await.unwrap();
        assert!(matches!(
            effects[0],
            Effect::OverdueMarked {
                installments: 2,
                receivables: 2
            }
        ));

        let plan = engine.db().installments().list_for_contract("C-18").await.unwrap();
        assert_eq!(plan[0].status, InstallmentStatus::Overdue);
        assert_eq!(plan[1].status, InstallmentStatus::Overdue);
        let entry = engine
            .db()
            .ledger()
            .get_live_by_link_key("RENTAL-C-18-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, ReceivableStatus::Overdue);
    }

    // =========================================================================
    // Advisory checks and audit
    // =========================================================================

    #[tokio::test]
    async fn test_check_sale_availability() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 3, 0).await;

        let ok = vec![StockedLine {
            sku: "VAC-T850".to_string(),
            quantity: 3,
            unit_price_cents: 9_900,
        }];
        engine.check_sale_availability(&ok).await.unwrap();

        let short = vec![StockedLine {
            sku: "VAC-T850".to_string(),
            quantity: 4,
            unit_price_cents: 9_900,
        }];
        assert!(matches!(
            engine.check_sale_availability(&short).await.unwrap_err(),
            EngineError::InsufficientStock { .. }
        ));

        let ghost = vec![StockedLine {
            sku: "GHOST-1".to_string(),
            quantity: 1,
            unit_price_cents: 9_900,
        }];
        assert!(matches!(
            engine.check_sale_availability(&ghost).await.unwrap_err(),
            EngineError::MissingSku(_)
        ));

        // advisory only: nothing written
        assert!(engine
            .db()
            .inventory()
            .history("VAC-T850", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_every_effect_leaves_an_audit_row() {
        let engine = engine().await;
        seed_item(&engine, "VAC-T850", 10, 3).await;

        let effects = engine
            .dispatch(&line_created(OrderKind::Sale, "V-600", "VAC-T850", 2))
            .await
            .unwrap();

        let rows = engine.db().audit().recent(10).await.unwrap();
        assert_eq!(rows.len(), effects.len());
        assert_eq!(rows[0].sku.as_deref(), Some("VAC-T850"));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected_upfront() {
        let engine = engine().await;

        let err = engine
            .dispatch(&line_created(OrderKind::Sale, "V-601", "bad sku!", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Guard(_)));

        let err = engine
            .dispatch(&line_created(OrderKind::Sale, "V-602", "VAC-T850", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Guard(_)));
    }
}
