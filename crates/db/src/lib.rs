//! PostgreSQL access for the weight monitor.
//!
//! The `animal` and `audittrail` tables belong to the host shelter
//! application and are never created here. The monitor owns only the
//! tables created by [`schema::ensure_weight_monitor_schema`].

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub mod models;
pub mod repositories;
pub mod schema;

pub type DbPool = sqlx::PgPool;

/// Open a single-connection pool from discrete connection options.
///
/// The monitor connects once per tick and closes the pool afterwards, so
/// one connection is all it ever needs. A refused connection is retried
/// until `timeout` elapses.
pub async fn connect_single(
    options: PgConnectOptions,
    timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await
}
