//! # Linking Keys
//!
//! The idempotency anchor of the whole engine.
//!
//! ## How Linking Keys Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Linking Key Derivation                              │
//! │                                                                         │
//! │  Rental contract C-17, installment 3  ──►  "RENTAL-C-17-3"             │
//! │  Sale order V-204, installment 2      ──►  "SALE-V-204-2"              │
//! │  Sale order V-205, single payment     ──►  "SALE-V-205"                │
//! │  Service order OS-88, completed       ──►  "SERVICE-OS-88"             │
//! │                                                                         │
//! │  The key is DETERMINISTIC: the same source entity always produces      │
//! │  the same key, so a retried trigger finds the entry it already         │
//! │  created and becomes a no-op. A partial unique index on the ledger     │
//! │  (WHERE status != 'cancelled') closes the race between two concurrent  │
//! │  triggers for the same key.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderKind;

/// A deterministic reference tying a derived ledger record back to its
/// originating entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkKey {
    /// One installment of a rental contract.
    RentalInstallment { contract_id: String, number: i64 },
    /// One installment of a sale's payment plan.
    SaleInstallment { order_id: String, number: i64 },
    /// A single-payment sale with no installment plan.
    SaleDirect { order_id: String },
    /// A completed service order.
    ServiceOrder { order_id: String },
}

impl LinkKey {
    /// Builds the key for an installment of the given producer kind.
    ///
    /// ## Errors
    /// - Service orders have no installments
    /// - Empty ids and numbers below 1 are rejected
    pub fn for_installment(kind: OrderKind, order_id: &str, number: i64) -> CoreResult<Self> {
        if order_id.trim().is_empty() {
            return Err(CoreError::InvalidLinkKey {
                reason: "empty source identifier".to_string(),
            });
        }
        if number < 1 {
            return Err(CoreError::InvalidLinkKey {
                reason: format!("installment number must be >= 1, got {number}"),
            });
        }

        match kind {
            OrderKind::Rental => Ok(LinkKey::RentalInstallment {
                contract_id: order_id.to_string(),
                number,
            }),
            OrderKind::Sale => Ok(LinkKey::SaleInstallment {
                order_id: order_id.to_string(),
                number,
            }),
            OrderKind::ServiceOrder => Err(CoreError::InvalidLinkKey {
                reason: "service orders have no installments".to_string(),
            }),
        }
    }

    /// Builds the key for a single-payment sale.
    pub fn for_direct_sale(order_id: &str) -> CoreResult<Self> {
        if order_id.trim().is_empty() {
            return Err(CoreError::InvalidLinkKey {
                reason: "empty sale identifier".to_string(),
            });
        }
        Ok(LinkKey::SaleDirect {
            order_id: order_id.to_string(),
        })
    }

    /// Builds the key for a completed service order.
    pub fn for_service_order(order_id: &str) -> CoreResult<Self> {
        if order_id.trim().is_empty() {
            return Err(CoreError::InvalidLinkKey {
                reason: "empty service order identifier".to_string(),
            });
        }
        Ok(LinkKey::ServiceOrder {
            order_id: order_id.to_string(),
        })
    }

    /// The producer subsystem this key points back to.
    pub fn source_kind(&self) -> OrderKind {
        match self {
            LinkKey::RentalInstallment { .. } => OrderKind::Rental,
            LinkKey::SaleInstallment { .. } | LinkKey::SaleDirect { .. } => OrderKind::Sale,
            LinkKey::ServiceOrder { .. } => OrderKind::ServiceOrder,
        }
    }

    /// The originating order/contract identifier.
    pub fn source_id(&self) -> &str {
        match self {
            LinkKey::RentalInstallment { contract_id, .. } => contract_id,
            LinkKey::SaleInstallment { order_id, .. } => order_id,
            LinkKey::SaleDirect { order_id } => order_id,
            LinkKey::ServiceOrder { order_id } => order_id,
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKey::RentalInstallment {
                contract_id,
                number,
            } => write!(f, "RENTAL-{contract_id}-{number}"),
            LinkKey::SaleInstallment { order_id, number } => {
                write!(f, "SALE-{order_id}-{number}")
            }
            LinkKey::SaleDirect { order_id } => write!(f, "SALE-{order_id}"),
            LinkKey::ServiceOrder { order_id } => write!(f, "SERVICE-{order_id}"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
