//! # Audit Store
//!
//! Append-only trace of derived effects. Written inside the same
//! transaction as the effects it describes; never read back by the
//! engine, only by reporting.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use crate::store::generate_id;
use cyclone_core::AuditRecord;

const COLUMNS: &str = "id, effect, link_key, sku, detail, created_at";

/// Store for the derived-effect audit trail.
#[derive(Debug, Clone)]
pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    /// Creates a new AuditStore.
    pub fn new(pool: SqlitePool) -> Self {
        AuditStore { pool }
    }

    /// Appends one trace row inside the caller's transaction.
    pub async fn append_in(
        conn: &mut SqliteConnection,
        effect: &str,
        link_key: Option<&str>,
        sku: Option<&str>,
        detail: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, effect, link_key, sku, detail, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(generate_id())
        .bind(effect)
        .bind(link_key)
        .bind(sku)
        .bind(detail)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Most recent trace rows, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(&format!(
            "SELECT {COLUMNS} FROM audit_log ORDER BY created_at DESC, id LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Trace rows touching a given linking key, oldest first.
    pub async fn for_link_key(&self, link_key: &str) -> DbResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(&format!(
            "SELECT {COLUMNS} FROM audit_log WHERE link_key = ?1 ORDER BY created_at"
        ))
        .bind(link_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
