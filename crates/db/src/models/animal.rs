//! The host application's `animal` table (only the columns the monitor uses).

use serde::Serialize;
use shelter_core::types::DbId;
use sqlx::FromRow;

/// An animal row. `weight` is in kilograms and may be unset.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Animal {
    pub id: DbId,
    pub animalname: String,
    pub weight: Option<f64>,
}
