//! Repository for `animal_weight_history` (append-only).

use shelter_core::types::{DbId, Timestamp};
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;

use crate::models::weight_history::{AppliedWeightUpdate, CreateWeightHistory, WeightHistoryEntry};
use crate::repositories::{AnimalRepo, MonitorCursorRepo};

/// Column list for history SELECT/RETURNING clauses.
const COLUMNS: &str = "\
    id, animalid, weight_date, username, \
    weight::float8 AS weight, created_date";

/// Column list for INSERT (excludes auto-generated `id` and `created_date`).
const INSERT_COLUMNS: &str = "animalid, weight_date, username, weight";

/// Provides insert and query operations for the weight history.
pub struct WeightHistoryRepo;

impl WeightHistoryRepo {
    /// Insert one history row.
    pub async fn insert<'e, E>(
        executor: E,
        dto: &CreateWeightHistory,
    ) -> Result<WeightHistoryEntry, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO animal_weight_history ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WeightHistoryEntry>(&query)
            .bind(dto.animalid)
            .bind(dto.weight_date)
            .bind(&dto.username)
            .bind(dto.weight)
            .fetch_one(executor)
            .await
    }

    /// Latest `weight_date` in the history, or `None` when it is empty.
    pub async fn latest_weight_date<'e, E>(executor: E) -> Result<Option<Timestamp>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Option<Timestamp>>(
            "SELECT MAX(weight_date) FROM animal_weight_history",
        )
        .fetch_one(executor)
        .await
    }

    /// History for one animal, newest first.
    pub async fn list_for_animal(
        pool: &PgPool,
        animal_id: DbId,
    ) -> Result<Vec<WeightHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM animal_weight_history \
             WHERE animalid = $1 \
             ORDER BY weight_date DESC, id DESC"
        );
        sqlx::query_as::<_, WeightHistoryEntry>(&query)
            .bind(animal_id)
            .fetch_all(pool)
            .await
    }

    /// Whether a history row identical to `dto` already exists.
    ///
    /// The weight is compared after narrowing to REAL, as it is stored.
    pub async fn is_recorded<'e, E>(executor: E, dto: &CreateWeightHistory) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM animal_weight_history \
                 WHERE animalid = $1 AND weight_date = $2 \
                   AND username = $3 AND weight = CAST($4 AS REAL))",
        )
        .bind(dto.animalid)
        .bind(dto.weight_date)
        .bind(&dto.username)
        .bind(dto.weight)
        .fetch_one(executor)
        .await
    }

    /// Apply a weight update within a transaction.
    ///
    /// Locks the animal row, writes the new weight and appends the history
    /// row. With `advance_cursor`, the named cursor moves to the entry's
    /// `weight_date` in the same transaction. Either all of it commits or
    /// none of it does.
    ///
    /// Returns `None` without touching the animal when an identical history
    /// row already exists (the update was applied by an earlier tick); the
    /// cursor is still advanced. A missing animal yields
    /// `sqlx::Error::RowNotFound`.
    pub async fn apply_update(
        pool: &PgPool,
        dto: &CreateWeightHistory,
        advance_cursor: Option<&str>,
    ) -> Result<Option<AppliedWeightUpdate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous_weight = AnimalRepo::current_weight_for_update(&mut *tx, dto.animalid)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let applied = if Self::is_recorded(&mut *tx, dto).await? {
            None
        } else {
            if !AnimalRepo::set_weight(&mut *tx, dto.animalid, dto.weight).await? {
                return Err(sqlx::Error::RowNotFound);
            }
            let entry = Self::insert(&mut *tx, dto).await?;
            Some(AppliedWeightUpdate {
                previous_weight,
                entry,
            })
        };

        if let Some(name) = advance_cursor {
            MonitorCursorRepo::advance(&mut *tx, name, dto.weight_date).await?;
        }

        tx.commit().await?;
        Ok(applied)
    }
}
