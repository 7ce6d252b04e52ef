//! # Read-Side Queries
//!
//! Reporting facade over the stores. Everything here is read-only; the
//! write path lives in [`crate::engine`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use cyclone_core::{AuditRecord, Receivable, ReceivableStatus, StockItem, StockMovement, StockedLine};
use cyclone_db::{Database, LedgerSummary};

/// Projected stock position of one SKU if a set of lines were applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockImpact {
    pub sku: String,
    pub current_quantity: i64,
    pub projected_quantity: i64,
    /// Projection at or below the reorder minimum.
    pub below_minimum: bool,
    /// No such active SKU; projection assumes a zero starting counter.
    pub unknown_sku: bool,
}

/// Read-only reporting over the ledger, inventory and audit trail.
#[derive(Clone)]
pub struct Reports {
    db: Database,
}

impl Reports {
    pub fn new(db: Database) -> Self {
        Reports { db }
    }

    // =========================================================================
    // Receivables
    // =========================================================================

    /// All entries for one debtor, cancelled included, newest due first.
    pub async fn receivables_by_debtor(&self, debtor: &str) -> EngineResult<Vec<Receivable>> {
        Ok(self.db.ledger().list_by_debtor(debtor).await?)
    }

    /// Entries in one status, due date ascending.
    pub async fn receivables_by_status(
        &self,
        status: ReceivableStatus,
    ) -> EngineResult<Vec<Receivable>> {
        Ok(self.db.ledger().list_by_status(status).await?)
    }

    /// Open (pending/overdue) entries due inside the inclusive range.
    pub async fn receivables_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<Receivable>> {
        Ok(self.db.ledger().list_open_due_between(from, to).await?)
    }

    /// Ledger totals per status plus the open entry count.
    pub async fn receivable_summary(&self) -> EngineResult<LedgerSummary> {
        Ok(self.db.ledger().summary().await?)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Current position of one SKU.
    pub async fn stock_level(&self, sku: &str) -> EngineResult<Option<StockItem>> {
        Ok(self.db.inventory().get_by_sku(sku).await?)
    }

    /// Movement journal for one SKU, newest first.
    pub async fn stock_history(&self, sku: &str, limit: u32) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.inventory().history(sku, limit).await?)
    }

    /// Active SKUs at or below their reorder minimum.
    pub async fn stock_below_minimum(&self) -> EngineResult<Vec<StockItem>> {
        Ok(self.db.inventory().list_below_minimum().await?)
    }

    /// Projects where the counters would land if the given lines were
    /// consumed, without writing anything.
    ///
    /// Lines for the same SKU are accumulated. Unknown SKUs are reported
    /// rather than rejected so a draft order can be previewed before its
    /// catalog is complete.
    pub async fn impact_preview(&self, lines: &[StockedLine]) -> EngineResult<Vec<StockImpact>> {
        let mut impacts: Vec<StockImpact> = Vec::new();
        let mut minimums: Vec<i64> = Vec::new();

        for line in lines {
            if let Some(pos) = impacts.iter().position(|i| i.sku == line.sku) {
                impacts[pos].projected_quantity -= line.quantity;
                continue;
            }

            let item = self.db.inventory().get_by_sku(&line.sku).await?;
            let (current, minimum, unknown) = match &item {
                Some(item) => (item.quantity, item.minimum_quantity, false),
                None => (0, 0, true),
            };
            impacts.push(StockImpact {
                sku: line.sku.clone(),
                current_quantity: current,
                projected_quantity: current - line.quantity,
                below_minimum: false,
                unknown_sku: unknown,
            });
            minimums.push(minimum);
        }

        // flag after accumulation, so split lines project correctly
        for (impact, minimum) in impacts.iter_mut().zip(minimums) {
            impact.below_minimum = impact.projected_quantity <= minimum;
        }

        Ok(impacts)
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Most recent audit rows.
    pub async fn recent_audit(&self, limit: u32) -> EngineResult<Vec<AuditRecord>> {
        Ok(self.db.audit().recent(limit).await?)
    }

    /// Full audit trail for one linking key.
    pub async fn audit_for_link_key(&self, link_key: &str) -> EngineResult<Vec<AuditRecord>> {
        Ok(self.db.audit().for_link_key(link_key).await?)
    }
}
