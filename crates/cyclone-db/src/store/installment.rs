//! # Installment Store
//!
//! Database operations for rental contract payment schedules.
//!
//! ## Regeneration Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Contract Activation (possibly repeated)                    │
//! │                                                                         │
//! │  Contract C-17 activated with amended terms                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  delete_pending_in(C-17)      ← discard regenerable rows               │
//! │       │                         (paid/overdue/cancelled history stays) │
//! │       ▼                                                                 │
//! │  existing_numbers_in(C-17)    ← e.g. {1, 2} already paid               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_batch_in(specs 3..=12) ← only the missing numbers              │
//! │                                                                         │
//! │  UNIQUE(contract_id, number) backstops the whole dance.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::store::generate_id;
use cyclone_core::{Installment, InstallmentSpec, InstallmentStatus, PaymentMethod};

const COLUMNS: &str = r#"
    id, contract_id, number, amount_cents, due_on, reference, status,
    paid_amount_cents, paid_on, payment_method, created_at, updated_at
"#;

/// Store for rental installment database operations.
#[derive(Debug, Clone)]
pub struct InstallmentStore {
    pool: SqlitePool,
}

impl InstallmentStore {
    /// Creates a new InstallmentStore.
    pub fn new(pool: SqlitePool) -> Self {
        InstallmentStore { pool }
    }

    // =========================================================================
    // Transactional Writes
    // =========================================================================

    /// Deletes the pending installments of a contract, returning what was
    /// deleted so the caller can cancel the ledger entries they back.
    ///
    /// Paid, overdue and cancelled rows are history and stay put.
    pub async fn delete_pending_in(
        conn: &mut SqliteConnection,
        contract_id: &str,
    ) -> DbResult<Vec<Installment>> {
        debug!(contract_id = %contract_id, "Deleting pending installments");

        let doomed = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {COLUMNS} FROM installments WHERE contract_id = ?1 AND status = 'pending'"
        ))
        .bind(contract_id)
        .fetch_all(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM installments WHERE contract_id = ?1 AND status = 'pending'")
            .bind(contract_id)
            .execute(&mut *conn)
            .await?;

        Ok(doomed)
    }

    /// Installment numbers that already exist for a contract (any status).
    pub async fn existing_numbers_in(
        conn: &mut SqliteConnection,
        contract_id: &str,
    ) -> DbResult<Vec<i64>> {
        let numbers: Vec<i64> = sqlx::query_scalar(
            "SELECT number FROM installments WHERE contract_id = ?1 ORDER BY number",
        )
        .bind(contract_id)
        .fetch_all(conn)
        .await?;

        Ok(numbers)
    }

    /// Inserts a batch of pending installments from schedule specs.
    ///
    /// The caller has already filtered out numbers that exist; the
    /// UNIQUE(contract_id, number) constraint backstops any mistake.
    pub async fn insert_batch_in(
        conn: &mut SqliteConnection,
        contract_id: &str,
        specs: &[InstallmentSpec],
    ) -> DbResult<Vec<Installment>> {
        debug!(
            contract_id = %contract_id,
            count = specs.len(),
            "Inserting installment batch"
        );

        let now = Utc::now();
        let mut created = Vec::with_capacity(specs.len());

        for spec in specs {
            let row = Installment {
                id: generate_id(),
                contract_id: contract_id.to_string(),
                number: spec.number,
                amount_cents: spec.amount_cents,
                due_on: spec.due_on,
                reference: spec.reference.clone(),
                status: InstallmentStatus::Pending,
                paid_amount_cents: None,
                paid_on: None,
                payment_method: None,
                created_at: now,
                updated_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO installments (
                    id, contract_id, number, amount_cents, due_on, reference,
                    status, paid_amount_cents, paid_on, payment_method,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&row.id)
            .bind(&row.contract_id)
            .bind(row.number)
            .bind(row.amount_cents)
            .bind(row.due_on)
            .bind(&row.reference)
            .bind(row.status)
            .bind(row.paid_amount_cents)
            .bind(row.paid_on)
            .bind(row.payment_method)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *conn)
            .await?;

            created.push(row);
        }

        Ok(created)
    }

    /// Records a payment-state change on one installment.
    ///
    /// ## Returns
    /// * `Ok(true)` - Installment updated
    /// * `Ok(false)` - No such installment
    pub async fn set_status_in(
        conn: &mut SqliteConnection,
        contract_id: &str,
        number: i64,
        status: InstallmentStatus,
        paid_amount_cents: Option<i64>,
        paid_on: Option<NaiveDate>,
        payment_method: Option<PaymentMethod>,
    ) -> DbResult<bool> {
        debug!(
            contract_id = %contract_id,
            number = number,
            status = ?status,
            "Updating installment status"
        );

        let result = sqlx::query(
            r#"
            UPDATE installments SET
                status = ?3,
                paid_amount_cents = ?4,
                paid_on = ?5,
                payment_method = ?6,
                updated_at = ?7
            WHERE contract_id = ?1 AND number = ?2
            "#,
        )
        .bind(contract_id)
        .bind(number)
        .bind(status)
        .bind(paid_amount_cents)
        .bind(paid_on)
        .bind(payment_method)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancels the open (pending or overdue) installments of a contract,
    /// returning the cancelled rows.
    pub async fn cancel_open_in(
        conn: &mut SqliteConnection,
        contract_id: &str,
    ) -> DbResult<Vec<Installment>> {
        debug!(contract_id = %contract_id, "Cancelling open installments");

        let open = sqlx::query_as::<_, Installment>(&format!(
            r#"
            SELECT {COLUMNS} FROM installments
            WHERE contract_id = ?1 AND status IN ('pending', 'overdue')
            "#
        ))
        .bind(contract_id)
        .fetch_all(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE installments SET
                status = 'cancelled',
                updated_at = ?2
            WHERE contract_id = ?1 AND status IN ('pending', 'overdue')
            "#,
        )
        .bind(contract_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(open)
    }

    /// Flips pending installments past their due date to overdue.
    ///
    /// ## Returns
    /// The installments flipped, so the caller can mirror the ledger.
    pub async fn mark_overdue_in(
        conn: &mut SqliteConnection,
        today: NaiveDate,
    ) -> DbResult<Vec<Installment>> {
        let late = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {COLUMNS} FROM installments WHERE status = 'pending' AND due_on < ?1"
        ))
        .bind(today)
        .fetch_all(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE installments SET
                status = 'overdue',
                updated_at = ?2
            WHERE status = 'pending' AND due_on < ?1
            "#,
        )
        .bind(today)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(late)
    }

    // =========================================================================
    // Pool Reads
    // =========================================================================

    /// Lists a contract's installments in schedule order.
    pub async fn list_for_contract(&self, contract_id: &str) -> DbResult<Vec<Installment>> {
        let rows = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {COLUMNS} FROM installments WHERE contract_id = ?1 ORDER BY number"
        ))
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetches one installment by contract and number.
    pub async fn get(&self, contract_id: &str, number: i64) -> DbResult<Option<Installment>> {
        let row = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {COLUMNS} FROM installments WHERE contract_id = ?1 AND number = ?2"
        ))
        .bind(contract_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists open installments due within a date range, across contracts.
    pub async fn list_open_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Installment>> {
        let rows = sqlx::query_as::<_, Installment>(&format!(
            r#"
            SELECT {COLUMNS} FROM installments
            WHERE status IN ('pending', 'overdue') AND due_on BETWEEN ?1 AND ?2
            ORDER BY due_on, contract_id, number
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
