//! Repository for `animal_weight_monitor_cursor`.

use shelter_core::types::Timestamp;
use sqlx::postgres::PgExecutor;

use crate::models::monitor_cursor::MonitorCursor;

/// Column list for cursor SELECT queries.
const COLUMNS: &str = "name, last_auditdate, updated_date";

/// Reads and advances named progress cursors.
pub struct MonitorCursorRepo;

impl MonitorCursorRepo {
    /// Find a cursor by name.
    pub async fn find<'e, E>(executor: E, name: &str) -> Result<Option<MonitorCursor>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM animal_weight_monitor_cursor WHERE name = $1");
        sqlx::query_as::<_, MonitorCursor>(&query)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// Create the cursor or move it forward to `position`.
    ///
    /// A cursor never moves backwards: advancing to an earlier position
    /// leaves the row unchanged.
    pub async fn advance<'e, E>(executor: E, name: &str, position: Timestamp) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO animal_weight_monitor_cursor (name, last_auditdate) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE \
             SET last_auditdate = EXCLUDED.last_auditdate, \
                 updated_date = CURRENT_TIMESTAMP \
             WHERE animal_weight_monitor_cursor.last_auditdate < EXCLUDED.last_auditdate",
        )
        .bind(name)
        .bind(position)
        .execute(executor)
        .await?;
        Ok(())
    }
}
