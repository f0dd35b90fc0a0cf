//! Progress marker for the weight monitor (`animal_weight_monitor_cursor`).

use serde::Serialize;
use shelter_core::types::Timestamp;
use sqlx::FromRow;

/// Cursor row name used by the weight monitor.
pub const WEIGHT_MONITOR_CURSOR: &str = "weight_monitor";

/// Audit rows up to and including `last_auditdate` have been applied or
/// permanently skipped.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonitorCursor {
    pub name: String,
    pub last_auditdate: Timestamp,
    pub updated_date: Option<Timestamp>,
}
