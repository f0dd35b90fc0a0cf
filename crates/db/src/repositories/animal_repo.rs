//! Repository for the host application's `animal` table.

use shelter_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::animal::Animal;

/// Column list for `animal` SELECT queries. `weight` is REAL and is widened
/// so it decodes as `f64`.
const COLUMNS: &str = "id, animalname, weight::float8 AS weight";

/// Provides lookups and the single weight write the monitor performs.
pub struct AnimalRepo;

impl AnimalRepo {
    /// Find every animal whose name equals `name`, ignoring case.
    ///
    /// Returns all matches ordered by id so callers can detect ambiguous
    /// names.
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Vec<Animal>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM animal \
             WHERE LOWER(animalname) = LOWER($1) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Animal>(&query)
            .bind(name)
            .fetch_all(executor)
            .await
    }

    /// Find an animal by id.
    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Animal>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM animal WHERE id = $1");
        sqlx::query_as::<_, Animal>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Read an animal's weight and lock the row for the current transaction.
    ///
    /// `None` means the animal does not exist; `Some(None)` means it has no
    /// weight recorded.
    pub async fn current_weight_for_update<'e, E>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Option<f64>>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT weight::float8 FROM animal WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Set an animal's weight in kilograms.
    ///
    /// Returns `true` if a row was updated.
    pub async fn set_weight<'e, E>(executor: E, id: DbId, weight: f64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE animal SET weight = $1 WHERE id = $2")
            .bind(weight)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
