//! Repository for the host application's `audittrail` table (read-only).

use shelter_core::types::Timestamp;
use shelter_core::weight_audit::{ONLINE_FORM_TABLE, PROCESSED_MARKER, WEIGHT_MARKER};
use sqlx::postgres::PgExecutor;

use crate::models::audit_trail::AuditEntry;

/// Column list for `audittrail` SELECT queries.
const COLUMNS: &str = "tablename, description, auditdate, username";

/// Provides the candidate query for weight updates.
pub struct AuditTrailRepo;

impl AuditTrailRepo {
    /// List processed weight forms audited strictly after `since`, oldest first.
    ///
    /// Rows are neither locked nor marked; running the same window twice
    /// returns the same rows.
    pub async fn list_weight_updates_since<'e, E>(
        executor: E,
        since: Timestamp,
    ) -> Result<Vec<AuditEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM audittrail \
             WHERE tablename = $1 \
               AND description LIKE $2 \
               AND description LIKE $3 \
               AND auditdate > $4 \
             ORDER BY auditdate ASC"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(ONLINE_FORM_TABLE)
            .bind(format!("%{WEIGHT_MARKER}%"))
            .bind(format!("%{PROCESSED_MARKER}%"))
            .bind(since)
            .fetch_all(executor)
            .await
    }
}
