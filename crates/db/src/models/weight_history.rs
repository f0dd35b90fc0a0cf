//! Weight history models (`animal_weight_history`, append-only).

use serde::{Deserialize, Serialize};
use shelter_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One applied weight update.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeightHistoryEntry {
    pub id: DbId,
    pub animalid: DbId,
    /// The audit timestamp of the form that carried the weight.
    pub weight_date: Timestamp,
    pub username: String,
    /// Kilograms.
    pub weight: f64,
    pub created_date: Option<Timestamp>,
}

/// DTO for inserting a history row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeightHistory {
    pub animalid: DbId,
    pub weight_date: Timestamp,
    pub username: String,
    pub weight: f64,
}

/// Result of a transactional weight update.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedWeightUpdate {
    /// Weight stored on the animal before the update.
    pub previous_weight: Option<f64>,
    pub entry: WeightHistoryEntry,
}

/// Whether `weight` survives storage in a REAL column.
///
/// PostgreSQL rejects a double that overflows to infinity or underflows to
/// zero when narrowed to REAL.
pub fn fits_real_column(weight: f64) -> bool {
    let narrowed = weight as f32;
    narrowed.is_finite() && (narrowed != 0.0 || weight == 0.0)
}
