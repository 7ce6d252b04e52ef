//! # Derived Effects
//!
//! Everything a reconciliation run did (or deliberately skipped), as data.
//! The dispatch returns these to the caller and the engine appends one
//! audit row per effect in the same transaction.

use serde::{Deserialize, Serialize};

use cyclone_core::ReceivableStatus;

/// One derived effect of a trigger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// A receivable entry was inserted.
    ReceivableCreated {
        link_key: String,
        amount_cents: i64,
    },

    /// A live entry already existed for the key; insert skipped.
    ///
    /// The idempotent outcome - re-delivered events land here.
    ReceivableSkipped { link_key: String },

    /// The live entry's payment state was mirrored from the source.
    ReceivableSynced {
        link_key: String,
        status: ReceivableStatus,
    },

    /// An open entry was cancelled.
    ReceivableCancelled { link_key: String },

    /// Every open entry of a source was cancelled (parent cancellation).
    ReceivablesCancelled { source_id: String, count: u64 },

    /// A stock movement was recorded and the counter updated.
    MovementRecorded {
        sku: String,
        delta: i64,
        stock_after: i64,
    },

    /// The reversal for this source already existed; nothing recorded.
    ReversalSkipped { source_id: String },

    /// Post-movement quantity at or below the SKU minimum.
    LowStockWarning {
        sku: String,
        quantity: i64,
        minimum: i64,
    },

    /// A service order drove the counter negative (backorder allowed).
    BackorderWarning { sku: String, quantity: i64 },

    /// Pending installments discarded during contract (re)activation.
    InstallmentsDiscarded { contract_id: String, count: usize },

    /// New installments inserted from the schedule.
    InstallmentsGenerated { contract_id: String, count: usize },

    /// Overdue sweep flipped this many pending entries.
    OverdueMarked { installments: u64, receivables: u64 },
}

impl Effect {
    /// Stable tag, used as the audit row's effect column.
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::ReceivableCreated { .. } => "receivable_created",
            Effect::ReceivableSkipped { .. } => "receivable_skipped",
            Effect::ReceivableSynced { .. } => "receivable_synced",
            Effect::ReceivableCancelled { .. } => "receivable_cancelled",
            Effect::ReceivablesCancelled { .. } => "receivables_cancelled",
            Effect::MovementRecorded { .. } => "movement_recorded",
            Effect::ReversalSkipped { .. } => "reversal_skipped",
            Effect::LowStockWarning { .. } => "low_stock_warning",
            Effect::BackorderWarning { .. } => "backorder_warning",
            Effect::InstallmentsDiscarded { .. } => "installments_discarded",
            Effect::InstallmentsGenerated { .. } => "installments_generated",
            Effect::OverdueMarked { .. } => "overdue_marked",
        }
    }

    /// Linking key this effect touches, if any (for the audit row).
    pub fn link_key(&self) -> Option<&str> {
        match self {
            Effect::ReceivableCreated { link_key, .. }
            | Effect::ReceivableSkipped { link_key }
            | Effect::ReceivableSynced { link_key, .. }
            | Effect::ReceivableCancelled { link_key } => Some(link_key),
            _ => None,
        }
    }

    /// SKU this effect touches, if any (for the audit row).
    pub fn sku(&self) -> Option<&str> {
        match self {
            Effect::MovementRecorded { sku, .. }
            | Effect::LowStockWarning { sku, .. }
            | Effect::BackorderWarning { sku, .. } => Some(sku),
            _ => None,
        }
    }

    /// Human-readable detail line for the audit row.
    pub fn detail(&self) -> String {
        match self {
            Effect::ReceivableCreated {
                link_key,
                amount_cents,
            } => format!("created {} for {} cents", link_key, amount_cents),
            Effect::ReceivableSkipped { link_key } => {
                format!("live entry already exists for {}", link_key)
            }
            Effect::ReceivableSynced { link_key, status } => {
                format!("{} mirrored to {:?}", link_key, status)
            }
            Effect::ReceivableCancelled { link_key } => format!("cancelled {}", link_key),
            Effect::ReceivablesCancelled { source_id, count } => {
                format!("cancelled {} open entries of {}", count, source_id)
            }
            Effect::MovementRecorded {
                sku,
                delta,
                stock_after,
            } => format!("{} moved {:+}, now {}", sku, delta, stock_after),
            Effect::ReversalSkipped { source_id } => {
                format!("reversal already recorded for {}", source_id)
            }
            Effect::LowStockWarning {
                sku,
                quantity,
                minimum,
            } => format!("{} at {} (minimum {})", sku, quantity, minimum),
            Effect::BackorderWarning { sku, quantity } => {
                format!("{} backordered, quantity {}", sku, quantity)
            }
            Effect::InstallmentsDiscarded { contract_id, count } => {
                format!("discarded {} pending installments of {}", count, contract_id)
            }
            Effect::InstallmentsGenerated { contract_id, count } => {
                format!("generated {} installments for {}", count, contract_id)
            }
            Effect::OverdueMarked {
                installments,
                receivables,
            } => format!(
                "{} installments and {} receivables now overdue",
                installments, receivables
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_tags_and_detail() {
        let effect = Effect::MovementRecorded {
            sku: "FILTER-X".to_string(),
            delta: -2,
            stock_after: 8,
        };
        assert_eq!(effect.kind(), "movement_recorded");
        assert_eq!(effect.sku(), Some("FILTER-X"));
        assert_eq!(effect.detail(), "FILTER-X moved -2, now 8");
    }

    #[test]
    fn test_effect_serializes_tagged() {
        let effect = Effect::ReceivableSkipped {
            link_key: "RENTAL-C17-2".to_string(),
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains("\"effect\":\"receivable_skipped\""));
    }
}
