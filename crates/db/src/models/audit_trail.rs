//! The host application's `audittrail` table.

use serde::Serialize;
use shelter_core::types::Timestamp;
use sqlx::FromRow;

/// One audit entry as read by the weight monitor.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub tablename: String,
    pub description: String,
    pub auditdate: Timestamp,
    pub username: String,
}
