//! The poll-and-apply pipeline.
//!
//! One tick: connect, ensure the monitor's tables, read the cursor, fetch
//! candidate audit rows, then parse, resolve and apply each one in
//! `auditdate` order, and disconnect.
//!
//! Rows sharing an `auditdate` form a group, and the cursor is a bare
//! timestamp, so it only moves past a group once every row in it has been
//! applied or permanently skipped. The move happens with the group's last
//! row (in the same transaction as its weight write). Rows the database
//! rejects as bad data are permanent skips. Any other failure ends the
//! tick; the failing group and everything after it are fetched again next
//! time, and rows of that group already applied are recognised from the
//! history and not applied twice.

use std::fmt;

use shelter_core::types::{DbId, Timestamp};
use shelter_core::units::kg_to_lb;
use shelter_core::weight_audit::{
    initial_checkpoint, parse_description, ParsedDescription, UnmatchedReason, WeightReading,
};
use shelter_db::models::audit_trail::AuditEntry;
use shelter_db::models::monitor_cursor::WEIGHT_MONITOR_CURSOR;
use shelter_db::models::weight_history::{fits_real_column, CreateWeightHistory};
use shelter_db::repositories::{AnimalRepo, AuditTrailRepo, MonitorCursorRepo, WeightHistoryRepo};
use shelter_db::schema::ensure_weight_monitor_schema;
use shelter_db::DbPool;
use sqlx::postgres::PgConnectOptions;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Failures that abort a whole tick.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Error creating weight history schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Error reading checkpoint: {0}")]
    Checkpoint(#[source] sqlx::Error),

    #[error("Error querying audit trail: {0}")]
    Fetch(#[source] sqlx::Error),
}

/// Failure to process a single audit row.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("animal lookup for '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("weight update for animal {animal_id} failed: {source}")]
    Write {
        animal_id: DbId,
        #[source]
        source: sqlx::Error,
    },

    #[error("recording skipped row failed: {0}")]
    Skip(#[source] sqlx::Error),
}

/// Why a row was permanently skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Unparsed(UnmatchedReason),
    UnknownAnimal(String),
    /// More than one animal has this name; none of them is updated.
    AmbiguousAnimal { name: String, matches: usize },
    /// The converted weight cannot be stored in a REAL column.
    OutOfRange { weight_text: String, weight_kg: f64 },
    /// The database refused the write as invalid data.
    Rejected(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unparsed(reason) => write!(f, "{reason}"),
            SkipReason::UnknownAnimal(name) => write!(f, "no animal named '{name}'"),
            SkipReason::AmbiguousAnimal { name, matches } => {
                write!(f, "{matches} animals are named '{name}'")
            }
            SkipReason::OutOfRange {
                weight_text,
                weight_kg,
            } => write!(f, "weight '{weight_text}' ({weight_kg} kg) is out of range"),
            SkipReason::Rejected(message) => write!(f, "database rejected the update: {message}"),
        }
    }
}

/// Outcome of one audit row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Applied { animal_id: DbId, weight_kg: f64 },
    /// The history already holds this update from an earlier tick.
    AlreadyApplied { animal_id: DbId },
    Skipped(SkipReason),
}

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Candidate rows fetched.
    pub fetched: usize,
    pub applied: usize,
    pub already_applied: usize,
    pub skipped: usize,
    /// Rows that failed to apply (at most one: the tick stops there).
    pub failed: usize,
    /// Rows after the failed one, left for the next tick.
    pub deferred: usize,
}

// ---------------------------------------------------------------------------
// WeightMonitor
// ---------------------------------------------------------------------------

/// Applies weights from processed online forms.
pub struct WeightMonitor {
    config: MonitorConfig,
}

impl WeightMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run ticks until `cancel` fires, sleeping the poll interval after each.
    ///
    /// Tick failures are logged and never end the loop. A tick in progress
    /// always runs to completion.
    pub async fn run_continuous(&self, cancel: CancellationToken) {
        let interval = self.config.poll_interval;
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Weight monitor started"
        );

        loop {
            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "Weight monitor tick failed");
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Weight monitor stopping");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// One full tick against the configured database.
    pub async fn run_once(&self) -> Result<TickReport, MonitorError> {
        let db = &self.config.db;
        tracing::info!(
            host = %db.host,
            port = db.port,
            database = %db.name,
            "Connecting to database"
        );
        self.run_once_with(db.connect_options()).await
    }

    /// One full tick: connect with `options`, process, disconnect.
    pub async fn run_once_with(&self, options: PgConnectOptions) -> Result<TickReport, MonitorError> {
        let pool = shelter_db::connect_single(options, self.config.db.connect_timeout)
            .await
            .map_err(MonitorError::Connection)?;
        tracing::info!("Database connection established");

        let result = self.process(&pool).await;
        pool.close().await;
        result
    }

    /// Everything in a tick between connecting and disconnecting.
    pub async fn process(&self, pool: &DbPool) -> Result<TickReport, MonitorError> {
        ensure_weight_monitor_schema(pool)
            .await
            .map_err(MonitorError::Schema)?;

        let checkpoint = read_checkpoint(pool)
            .await
            .map_err(MonitorError::Checkpoint)?;
        tracing::info!(position = %checkpoint.position, "Processing weight updates since checkpoint");

        let candidates = AuditTrailRepo::list_weight_updates_since(pool, checkpoint.position)
            .await
            .map_err(MonitorError::Fetch)?;

        let mut report = TickReport {
            fetched: candidates.len(),
            ..TickReport::default()
        };

        if candidates.is_empty() {
            tracing::debug!("No new weight updates to process");
            return Ok(report);
        }
        tracing::info!(count = candidates.len(), "Found new weight updates");

        // A seeded checkpoint is stored before any row, so a failure in the
        // first group is refetched from the same position.
        if !checkpoint.stored {
            MonitorCursorRepo::advance(pool, WEIGHT_MONITOR_CURSOR, checkpoint.position)
                .await
                .map_err(MonitorError::Checkpoint)?;
        }

        for (idx, entry) in candidates.iter().enumerate() {
            let closes_group = candidates
                .get(idx + 1)
                .map_or(true, |next| next.auditdate != entry.auditdate);

            match self.process_entry(pool, entry, closes_group).await {
                Ok(RowOutcome::Applied { .. }) => report.applied += 1,
                Ok(RowOutcome::AlreadyApplied { animal_id }) => {
                    tracing::debug!(
                        auditdate = %entry.auditdate,
                        animal_id,
                        "Weight update already recorded"
                    );
                    report.already_applied += 1;
                }
                Ok(RowOutcome::Skipped(reason)) => {
                    tracing::warn!(
                        auditdate = %entry.auditdate,
                        description = %entry.description,
                        %reason,
                        "Skipping audit row"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    report.deferred = candidates.len() - idx - 1;
                    tracing::error!(
                        auditdate = %entry.auditdate,
                        error = %e,
                        deferred = report.deferred,
                        "Error processing weight update, retrying next tick"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            applied = report.applied,
            already_applied = report.already_applied,
            skipped = report.skipped,
            failed = report.failed,
            fetched = report.fetched,
            "Weight update tick complete"
        );
        Ok(report)
    }

    /// Parse, resolve and apply one audit row.
    ///
    /// `closes_group` marks the last fetched row with this `auditdate`; only
    /// that row moves the cursor.
    pub async fn process_entry(
        &self,
        pool: &DbPool,
        entry: &AuditEntry,
        closes_group: bool,
    ) -> Result<RowOutcome, ApplyError> {
        let advance = closes_group.then_some(WEIGHT_MONITOR_CURSOR);

        let reading = match parse_description(&entry.description) {
            ParsedDescription::Matched(reading) => reading,
            ParsedDescription::Unmatched(reason) => {
                return skip(pool, entry, SkipReason::Unparsed(reason), advance).await;
            }
        };

        let animal_id = match resolve_animal(pool, &reading).await? {
            Ok(id) => id,
            Err(reason) => return skip(pool, entry, reason, advance).await,
        };

        match self.apply(pool, entry, &reading, animal_id, advance).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(reason)) => skip(pool, entry, reason, advance).await,
            Err(e) => Err(e),
        }
    }

    /// Write one resolved reading. The inner `Err` is a permanent skip.
    async fn apply(
        &self,
        pool: &DbPool,
        entry: &AuditEntry,
        reading: &WeightReading,
        animal_id: DbId,
        advance: Option<&str>,
    ) -> Result<Result<RowOutcome, SkipReason>, ApplyError> {
        let policy = self.config.unit_policy;
        let weight_kg = policy.to_kilograms(reading.weight);
        if !fits_real_column(weight_kg) {
            return Ok(Err(SkipReason::OutOfRange {
                weight_text: reading.weight_text.clone(),
                weight_kg,
            }));
        }
        let weight_lb = (kg_to_lb(weight_kg) * 10.0).round() / 10.0;

        let dto = CreateWeightHistory {
            animalid: animal_id,
            weight_date: entry.auditdate,
            username: entry.username.clone(),
            weight: weight_kg,
        };

        let applied = match WeightHistoryRepo::apply_update(pool, &dto, advance).await {
            Ok(Some(applied)) => applied,
            Ok(None) => return Ok(Ok(RowOutcome::AlreadyApplied { animal_id })),
            Err(e) if is_data_error(&e) => return Ok(Err(SkipReason::Rejected(e.to_string()))),
            Err(source) => return Err(ApplyError::Write { animal_id, source }),
        };

        tracing::info!(
            animal_id,
            animal = %reading.animal_name,
            raw = %reading.weight_text,
            unit = ?policy.detect(reading.weight),
            previous_kg = ?applied.previous_weight,
            weight_kg,
            weight_lb,
            username = %entry.username,
            "Updated animal weight"
        );

        Ok(Ok(RowOutcome::Applied {
            animal_id,
            weight_kg,
        }))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Where a tick starts fetching.
struct Checkpoint {
    position: Timestamp,
    /// `false` when the position was seeded and no cursor row exists yet.
    stored: bool,
}

/// The position to fetch after.
///
/// Without a cursor row (first run, or upgrading from a deployment that only
/// had the history table) this is the latest history timestamp, or the
/// initial checkpoint when the history is empty.
async fn read_checkpoint(pool: &DbPool) -> Result<Checkpoint, sqlx::Error> {
    if let Some(cursor) = MonitorCursorRepo::find(pool, WEIGHT_MONITOR_CURSOR).await? {
        return Ok(Checkpoint {
            position: cursor.last_auditdate,
            stored: true,
        });
    }
    let latest = WeightHistoryRepo::latest_weight_date(pool).await?;
    Ok(Checkpoint {
        position: latest.unwrap_or_else(initial_checkpoint),
        stored: false,
    })
}

/// Resolve an animal name to exactly one id.
async fn resolve_animal(
    pool: &DbPool,
    reading: &WeightReading,
) -> Result<Result<DbId, SkipReason>, ApplyError> {
    let animals = AnimalRepo::find_by_name(pool, &reading.animal_name)
        .await
        .map_err(|source| ApplyError::Lookup {
            name: reading.animal_name.clone(),
            source,
        })?;

    Ok(match animals.as_slice() {
        [animal] => Ok(animal.id),
        [] => Err(SkipReason::UnknownAnimal(reading.animal_name.clone())),
        many => Err(SkipReason::AmbiguousAnimal {
            name: reading.animal_name.clone(),
            matches: many.len(),
        }),
    })
}

/// Record a permanent skip, moving the cursor past the row when it closes
/// its group.
async fn skip(
    pool: &DbPool,
    entry: &AuditEntry,
    reason: SkipReason,
    advance: Option<&str>,
) -> Result<RowOutcome, ApplyError> {
    if let Some(name) = advance {
        MonitorCursorRepo::advance(pool, name, entry.auditdate)
            .await
            .map_err(ApplyError::Skip)?;
    }
    Ok(RowOutcome::Skipped(reason))
}

/// SQLSTATE classes 22 (data exception) and 23 (integrity constraint
/// violation): the row itself is bad and will fail the same way again.
fn is_data_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("22") || code.starts_with("23")),
        _ => false,
    }
}
