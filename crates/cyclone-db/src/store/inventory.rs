//! # Inventory Store
//!
//! Database operations for stock items and the movement journal.
//!
//! ## Live Counter Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Quantity Update Strategy                               │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write absolute value (lost updates)               │
//! │     let q = read();  UPDATE stock_items SET quantity = q - 3           │
//! │                                                                         │
//! │  ✅ CORRECT: relative delta in the movement's transaction              │
//! │     UPDATE stock_items SET quantity = quantity - 3                     │
//! │                                                                         │
//! │  Every movement row carries stock_before/stock_after snapshots of      │
//! │  the counter. Those exist for AUDIT - the counter itself is only       │
//! │  ever touched with a relative delta, so two concurrent writers         │
//! │  cannot clobber each other.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::store::generate_id;
use cyclone_core::{MovementDirection, MovementReason, OrderKind, StockItem, StockMovement};

const ITEM_COLUMNS: &str = r#"
    sku, name, quantity, minimum_quantity, unit_cost_cents, is_active,
    created_at, updated_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    id, sku, direction, reason, quantity, unit_cost_cents,
    source_kind, source_id, cancellation, stock_before, stock_after,
    note, created_at
"#;

/// Parameters for recording one stock movement.
///
/// The id, counter snapshots and timestamp are filled in by the store.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub sku: String,
    pub direction: MovementDirection,
    pub reason: MovementReason,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub source_kind: Option<OrderKind>,
    pub source_id: Option<String>,
    /// Compensating movement from an order cancellation.
    pub cancellation: bool,
    pub note: Option<String>,
}

/// Store for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    pool: SqlitePool,
}

impl InventoryStore {
    /// Creates a new InventoryStore.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryStore { pool }
    }

    // =========================================================================
    // Transactional Writes
    // =========================================================================

    /// Records a movement and applies its delta to the live counter,
    /// inside the caller's transaction.
    ///
    /// ## What This Does (one transaction, caller-owned)
    /// 1. Reads the current live quantity (for the audit snapshots)
    /// 2. Inserts the append-only movement row
    /// 3. Applies `quantity = quantity + delta` (relative, never absolute)
    ///
    /// ## Returns
    /// The recorded movement with its before/after snapshots.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - No active item for the SKU
    pub async fn apply_movement_in(
        conn: &mut SqliteConnection,
        movement: &NewMovement,
    ) -> DbResult<StockMovement> {
        debug!(
            sku = %movement.sku,
            direction = ?movement.direction,
            quantity = movement.quantity,
            "Applying stock movement"
        );

        let stock_before: i64 = sqlx::query_scalar(
            "SELECT quantity FROM stock_items WHERE sku = ?1 AND is_active = 1",
        )
        .bind(&movement.sku)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("StockItem", &movement.sku))?;

        let delta = movement.direction.signed(movement.quantity);
        let stock_after = stock_before + delta;

        let record = StockMovement {
            id: generate_id(),
            sku: movement.sku.clone(),
            direction: movement.direction,
            reason: movement.reason,
            quantity: movement.quantity,
            unit_cost_cents: movement.unit_cost_cents,
            source_kind: movement.source_kind,
            source_id: movement.source_id.clone(),
            cancellation: movement.cancellation,
            stock_before,
            stock_after,
            note: movement.note.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, sku, direction, reason, quantity, unit_cost_cents,
                source_kind, source_id, cancellation, stock_before, stock_after,
                note, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.sku)
        .bind(record.direction)
        .bind(record.reason)
        .bind(record.quantity)
        .bind(record.unit_cost_cents)
        .bind(record.source_kind)
        .bind(&record.source_id)
        .bind(record.cancellation)
        .bind(record.stock_before)
        .bind(record.stock_after)
        .bind(&record.note)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        // Relative delta, never the computed absolute
        sqlx::query(
            r#"
            UPDATE stock_items SET
                quantity = quantity + ?2,
                updated_at = ?3
            WHERE sku = ?1
            "#,
        )
        .bind(&record.sku)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Fetches an item by SKU inside the caller's transaction.
    pub async fn get_by_sku_in(
        conn: &mut SqliteConnection,
        sku: &str,
    ) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE sku = ?1 AND is_active = 1"
        ))
        .bind(sku)
        .fetch_optional(conn)
        .await?;

        Ok(item)
    }

    /// Checks whether a compensating movement already exists for an order,
    /// inside the caller's transaction.
    ///
    /// The no-double-reversal guard: an order cancellation that already
    /// produced `cancellation = 1` movements must not produce more.
    pub async fn reversal_exists_in(
        conn: &mut SqliteConnection,
        source_kind: OrderKind,
        source_id: &str,
    ) -> DbResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM stock_movements
                WHERE source_kind = ?1 AND source_id = ?2 AND cancellation = 1
            )
            "#,
        )
        .bind(source_kind)
        .bind(source_id)
        .fetch_one(conn)
        .await?;

        Ok(exists != 0)
    }

    // =========================================================================
    // Pool Operations
    // =========================================================================

    /// Inserts a new stock item.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - SKU already exists
    pub async fn insert_item(&self, item: &StockItem) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting stock item");

        sqlx::query(
            r#"
            INSERT INTO stock_items (
                sku, name, quantity, minimum_quantity, unit_cost_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.minimum_quantity)
        .bind(item.unit_cost_cents)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a standalone movement (restock, manual adjustment) in its
    /// own transaction.
    pub async fn apply_movement(&self, movement: &NewMovement) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;
        let record = Self::apply_movement_in(&mut tx, movement).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Fetches an item by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE sku = ?1 AND is_active = 1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists active items, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists active items at or below their reorder threshold.
    pub async fn list_below_minimum(&self) -> DbResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM stock_items
            WHERE is_active = 1 AND quantity <= minimum_quantity
            ORDER BY name
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Movement history for a SKU, newest first.
    pub async fn history(&self, sku: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS} FROM stock_movements
            WHERE sku = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#
        ))
        .bind(sku)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Every movement derived from a given order, oldest first.
    pub async fn movements_for_source(
        &self,
        source_kind: OrderKind,
        source_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS} FROM stock_movements
            WHERE source_kind = ?1 AND source_id = ?2
            ORDER BY created_at
            "#
        ))
        .bind(source_kind)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Soft-deletes an item by setting is_active = false.
    ///
    /// Historical movements still reference the SKU.
    pub async fn soft_delete(&self, sku: &str) -> DbResult<()> {
        debug!(sku = %sku, "Soft-deleting stock item");

        let result = sqlx::query(
            "UPDATE stock_items SET is_active = 0, updated_at = ?2 WHERE sku = ?1",
        )
        .bind(sku)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockItem", sku));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
