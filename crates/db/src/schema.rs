//! Idempotent creation of the tables the weight monitor owns.

use sqlx::PgPool;

/// Statements run on every tick; each must be safe to repeat.
const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS animal_weight_history (\
        id SERIAL PRIMARY KEY, \
        animalid INTEGER NOT NULL, \
        weight_date TIMESTAMP NOT NULL, \
        username VARCHAR(255) NOT NULL, \
        weight REAL NOT NULL, \
        created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
    )",
    "CREATE INDEX IF NOT EXISTS idx_animal_weight_history_animalid \
        ON animal_weight_history (animalid)",
    "CREATE INDEX IF NOT EXISTS idx_animal_weight_history_weight_date \
        ON animal_weight_history (weight_date)",
    "CREATE TABLE IF NOT EXISTS animal_weight_monitor_cursor (\
        name VARCHAR(64) PRIMARY KEY, \
        last_auditdate TIMESTAMP NOT NULL, \
        updated_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
    )",
];

/// Create `animal_weight_history`, its indexes, and the cursor table if
/// they do not exist yet.
pub async fn ensure_weight_monitor_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Weight monitor schema ensured");
    Ok(())
}
