//! # Ledger Store
//!
//! Database operations for the Accounts Receivable ledger.
//!
//! ## Idempotency at the Storage Level
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              The Linking-Key Index Is the Anchor                        │
//! │                                                                         │
//! │  CREATE UNIQUE INDEX idx_receivables_link_key_live                     │
//! │      ON receivables(link_key) WHERE status != 'cancelled';             │
//! │                                                                         │
//! │  insert_in(entry with link_key 'RENTAL-C17-2')                         │
//! │       │                                                                 │
//! │       ├── no live row for key → INSERT succeeds → Ok(true)             │
//! │       │                                                                 │
//! │       └── live row exists → UNIQUE violation → Ok(false)               │
//! │                              (idempotent no-op, NOT an error)          │
//! │                                                                         │
//! │  A cancelled predecessor does not count: the partial index lets a      │
//! │  re-created entry for the same source coexist with its cancelled       │
//! │  history.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cyclone_core::{Receivable, ReceivableStatus};

/// Aggregate totals over the ledger, grouped by status.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerSummary {
    pub pending_cents: i64,
    pub paid_cents: i64,
    pub overdue_cents: i64,
    pub cancelled_cents: i64,
    pub open_count: i64,
}

impl LedgerSummary {
    /// Total still owed (pending + overdue).
    pub fn open_cents(&self) -> i64 {
        self.pending_cents + self.overdue_cents
    }
}

const SELECT_COLUMNS: &str = r#"
    id, link_key, description, debtor, source_kind, source_id,
    amount_cents, issued_on, due_on, status,
    paid_amount_cents, paid_on, payment_method, note,
    created_at, updated_at
"#;

/// Store for Accounts Receivable database operations.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.ledger();
///
/// // Pool reads
/// let open = store.list_open().await?;
///
/// // Transactional writes (engine owns the transaction)
/// LedgerStore::insert_in(&mut *tx, &entry).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    /// Creates a new LedgerStore.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerStore { pool }
    }

    // =========================================================================
    // Transactional Writes
    // =========================================================================

    /// Inserts a receivable, treating a linking-key collision as a no-op.
    ///
    /// ## Returns
    /// * `Ok(true)` - Entry inserted
    /// * `Ok(false)` - A live entry already exists for this linking key
    /// * `Err(_)` - Any other database failure
    pub async fn insert_in(conn: &mut SqliteConnection, entry: &Receivable) -> DbResult<bool> {
        debug!(link_key = %entry.link_key, "Inserting receivable");

        let result = sqlx::query(
            r#"
            INSERT INTO receivables (
                id, link_key, description, debtor, source_kind, source_id,
                amount_cents, issued_on, due_on, status,
                paid_amount_cents, paid_on, payment_method, note,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16
            )
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.link_key)
        .bind(&entry.description)
        .bind(&entry.debtor)
        .bind(entry.source_kind)
        .bind(&entry.source_id)
        .bind(entry.amount_cents)
        .bind(entry.issued_on)
        .bind(entry.due_on)
        .bind(entry.status)
        .bind(entry.paid_amount_cents)
        .bind(entry.paid_on)
        .bind(entry.payment_method)
        .bind(&entry.note)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(conn)
        .await
        .map_err(DbError::from);

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_unique_violation() => {
                debug!(link_key = %entry.link_key, "Live entry already exists, skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches the live (non-cancelled) entry for a linking key, in-transaction.
    pub async fn get_live_in(
        conn: &mut SqliteConnection,
        link_key: &str,
    ) -> DbResult<Option<Receivable>> {
        let entry = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {SELECT_COLUMNS} FROM receivables WHERE link_key = ?1 AND status != 'cancelled'"
        ))
        .bind(link_key)
        .fetch_optional(conn)
        .await?;

        Ok(entry)
    }

    /// Mirrors a payment-state change onto the live entry for a linking key.
    ///
    /// Cancelled entries are never resurrected; they simply don't match.
    ///
    /// ## Returns
    /// * `Ok(true)` - Live entry updated
    /// * `Ok(false)` - No live entry for this key
    pub async fn sync_payment_in(
        conn: &mut SqliteConnection,
        link_key: &str,
        status: ReceivableStatus,
        paid_amount_cents: Option<i64>,
        paid_on: Option<NaiveDate>,
        payment_method: Option<cyclone_core::PaymentMethod>,
    ) -> DbResult<bool> {
        debug!(link_key = %link_key, status = ?status, "Syncing receivable payment state");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE receivables SET
                status = ?2,
                paid_amount_cents = ?3,
                paid_on = ?4,
                payment_method = ?5,
                updated_at = ?6
            WHERE link_key = ?1 AND status != 'cancelled'
            "#,
        )
        .bind(link_key)
        .bind(status)
        .bind(paid_amount_cents)
        .bind(paid_on)
        .bind(payment_method)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancels the open (pending or overdue) entry for a linking key.
    ///
    /// Paid entries are protected: money already received is a historical
    /// fact and cancelling the source does not un-receive it.
    ///
    /// ## Returns
    /// * `Ok(true)` - Entry cancelled
    /// * `Ok(false)` - No open entry for this key
    pub async fn cancel_open_in(
        conn: &mut SqliteConnection,
        link_key: &str,
        note: &str,
    ) -> DbResult<bool> {
        debug!(link_key = %link_key, "Cancelling open receivable");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE receivables SET
                status = 'cancelled',
                note = ?2,
                updated_at = ?3
            WHERE link_key = ?1 AND status IN ('pending', 'overdue')
            "#,
        )
        .bind(link_key)
        .bind(note)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancels every open entry originating from a given order/contract.
    ///
    /// ## Returns
    /// Number of entries cancelled.
    pub async fn cancel_open_for_source_in(
        conn: &mut SqliteConnection,
        source_kind: cyclone_core::OrderKind,
        source_id: &str,
        note: &str,
    ) -> DbResult<u64> {
        debug!(source_id = %source_id, "Cancelling open receivables for source");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE receivables SET
                status = 'cancelled',
                note = ?3,
                updated_at = ?4
            WHERE source_kind = ?1 AND source_id = ?2
              AND status IN ('pending', 'overdue')
            "#,
        )
        .bind(source_kind)
        .bind(source_id)
        .bind(note)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Flips pending entries past their due date to overdue, in-transaction.
    ///
    /// ## Returns
    /// Number of entries flipped.
    pub async fn mark_overdue_in(conn: &mut SqliteConnection, today: NaiveDate) -> DbResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE receivables SET
                status = 'overdue',
                updated_at = ?2
            WHERE status = 'pending' AND due_on < ?1
            "#,
        )
        .bind(today)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Pool Reads
    // =========================================================================

    /// Fetches the live (non-cancelled) entry for a linking key.
    pub async fn get_live_by_link_key(&self, link_key: &str) -> DbResult<Option<Receivable>> {
        let entry = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {SELECT_COLUMNS} FROM receivables WHERE link_key = ?1 AND status != 'cancelled'"
        ))
        .bind(link_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists all entries (any status) for a linking key, newest first.
    ///
    /// Useful for seeing a cancelled history alongside the live entry.
    pub async fn list_by_link_key(&self, link_key: &str) -> DbResult<Vec<Receivable>> {
        let entries = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {SELECT_COLUMNS} FROM receivables WHERE link_key = ?1 ORDER BY created_at DESC"
        ))
        .bind(link_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists entries for a debtor, any status, ordered by due date.
    pub async fn list_by_debtor(&self, debtor: &str) -> DbResult<Vec<Receivable>> {
        let entries = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {SELECT_COLUMNS} FROM receivables WHERE debtor = ?1 ORDER BY due_on"
        ))
        .bind(debtor)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists entries with a given status, ordered by due date.
    pub async fn list_by_status(&self, status: ReceivableStatus) -> DbResult<Vec<Receivable>> {
        let entries = sqlx::query_as::<_, Receivable>(&format!(
            "SELECT {SELECT_COLUMNS} FROM receivables WHERE status = ?1 ORDER BY due_on"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists open (pending or overdue) entries due within a date range.
    pub async fn list_open_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Receivable>> {
        let entries = sqlx::query_as::<_, Receivable>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM receivables
            WHERE status IN ('pending', 'overdue') AND due_on BETWEEN ?1 AND ?2
            ORDER BY due_on
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists every entry derived from a given order/contract.
    pub async fn list_by_source(
        &self,
        source_kind: cyclone_core::OrderKind,
        source_id: &str,
    ) -> DbResult<Vec<Receivable>> {
        let entries = sqlx::query_as::<_, Receivable>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM receivables
            WHERE source_kind = ?1 AND source_id = ?2
            ORDER BY due_on, created_at
            "#
        ))
        .bind(source_kind)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Aggregate totals by status, plus the count of open entries.
    pub async fn summary(&self) -> DbResult<LedgerSummary> {
        let summary = sqlx::query_as::<_, LedgerSummary>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'pending'   THEN amount_cents END), 0) AS pending_cents,
                COALESCE(SUM(CASE WHEN status = 'paid'      THEN amount_cents END), 0) AS paid_cents,
                COALESCE(SUM(CASE WHEN status = 'overdue'   THEN amount_cents END), 0) AS overdue_cents,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN amount_cents END), 0) AS cancelled_cents,
                COALESCE(SUM(CASE WHEN status IN ('pending', 'overdue') THEN 1 ELSE 0 END), 0) AS open_count
            FROM receivables
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Counts live entries (for diagnostics).
    pub async fn count_live(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receivables WHERE status != 'cancelled'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::store::generate_id;
    use cyclone_core::OrderKind;

    fn entry(link_key: &str) -> Receivable {
        let now = Utc::now();
        Receivable {
            id: generate_id(),
            link_key: link_key.to_string(),
            description: "Rental #C-17 - installment 2/12".to_string(),
            debtor: "Maria Souza".to_string(),
            source_kind: OrderKind::Rental,
            source_id: "C-17".to_string(),
            amount_cents: 15000,
            issued_on: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            due_on: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            status: ReceivableStatus::Pending,
            paid_amount_cents: None,
            paid_on: None,
            payment_method: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_link_key_is_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(LedgerStore::insert_in(&mut tx, &entry("RENTAL-C17-2"))
            .await
            .unwrap());
        // Second insert for the same key: swallowed, not an error
        assert!(!LedgerStore::insert_in(&mut tx, &entry("RENTAL-C17-2"))
            .await
            .unwrap());
        tx.commit().await.unwrap();

        assert_eq!(db.ledger().count_live().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_entry_frees_the_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        LedgerStore::insert_in(&mut tx, &entry("RENTAL-C17-2"))
            .await
            .unwrap();
        assert!(
            LedgerStore::cancel_open_in(&mut tx, "RENTAL-C17-2", "Contract amended")
                .await
                .unwrap()
        );
        // The partial index no longer sees the cancelled row
        assert!(LedgerStore::insert_in(&mut tx, &entry("RENTAL-C17-2"))
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let all = db.ledger().list_by_link_key("RENTAL-C17-2").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.ledger().count_live().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_paid_entry_survives_cancel() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        LedgerStore::insert_in(&mut tx, &entry("SALE-V42-1")).await.unwrap();
        LedgerStore::sync_payment_in(
            &mut tx,
            "SALE-V42-1",
            ReceivableStatus::Paid,
            Some(15000),
            NaiveDate::from_ymd_opt(2025, 2, 1),
            None,
        )
        .await
        .unwrap();

        // Cancelling the source must not touch a paid entry
        assert!(!LedgerStore::cancel_open_in(&mut tx, "SALE-V42-1", "Order cancelled")
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let live = db
            .ledger()
            .get_live_by_link_key("SALE-V42-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.status, ReceivableStatus::Paid);
    }

    #[tokio::test]
    async fn test_overdue_sweep() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut late = entry("RENTAL-C17-1");
        late.due_on = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        LedgerStore::insert_in(&mut tx, &late).await.unwrap();
        LedgerStore::insert_in(&mut tx, &entry("RENTAL-C17-2"))
            .await
            .unwrap();

        let flipped =
            LedgerStore::mark_overdue_in(&mut tx, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
                .await
                .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(flipped, 1);
        let summary = db.ledger().summary().await.unwrap();
        assert_eq!(summary.overdue_cents, 15000);
        assert_eq!(summary.pending_cents, 15000);
        assert_eq!(summary.open_count, 2);
    }
}
