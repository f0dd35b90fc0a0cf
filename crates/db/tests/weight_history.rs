//! Integration tests for the weight monitor's repositories.
//!
//! Each test gets a fresh database with the host application's `animal`
//! and `audittrail` tables loaded from `fixtures/host_schema.sql`.

use chrono::{NaiveDate, NaiveDateTime};
use shelter_db::models::monitor_cursor::WEIGHT_MONITOR_CURSOR;
use shelter_db::models::weight_history::CreateWeightHistory;
use shelter_db::repositories::{AnimalRepo, AuditTrailRepo, MonitorCursorRepo, WeightHistoryRepo};
use shelter_db::schema::ensure_weight_monitor_schema;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

async fn insert_audit(pool: &PgPool, tablename: &str, description: &str, at: NaiveDateTime) {
    sqlx::query(
        "INSERT INTO audittrail (auditdate, username, tablename, description) \
         VALUES ($1, 'volunteer', $2, $3)",
    )
    .bind(at)
    .bind(tablename)
    .bind(description)
    .execute(pool)
    .await
    .unwrap();
}

async fn history_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM animal_weight_history")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn update(animalid: i32, weight: f64, at: NaiveDateTime) -> CreateWeightHistory {
    CreateWeightHistory {
        animalid,
        weight_date: at,
        username: "volunteer".to_string(),
        weight,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn schema_creation_is_idempotent(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();
    ensure_weight_monitor_schema(&pool).await.unwrap();

    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT indexname::text FROM pg_indexes \
         WHERE tablename = 'animal_weight_history' ORDER BY indexname",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(indexes.contains(&"idx_animal_weight_history_animalid".to_string()));
    assert!(indexes.contains(&"idx_animal_weight_history_weight_date".to_string()));
    assert_eq!(history_count(&pool).await, 0);
}

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn latest_weight_date_is_none_when_empty(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();
    assert_eq!(WeightHistoryRepo::latest_weight_date(&pool).await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Animals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn find_by_name_ignores_case(pool: PgPool) {
    let found = AnimalRepo::find_by_name(&pool, "LUNA").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 1);
    assert_eq!(found[0].weight, Some(0.5));

    let conkers = AnimalRepo::find_by_name(&pool, "conker").await.unwrap();
    let ids: Vec<i32> = conkers.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![4, 5]);

    assert!(AnimalRepo::find_by_name(&pool, "Lun").await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn audit_query_filters_and_orders(pool: PgPool) {
    let form = "onlineformincoming";
    insert_audit(&pool, form, "Weight form: Spike, weight 800, =Processed=", ts(2, 9, 0)).await;
    insert_audit(&pool, form, "Weight form: Luna, weight 250, =Processed=", ts(1, 9, 0)).await;
    insert_audit(&pool, form, "Weight form: Luna, weight 260, =Received=", ts(1, 10, 0)).await;
    insert_audit(&pool, "animal", "Weight form: Luna, weight 270, =Processed=", ts(1, 11, 0)).await;
    insert_audit(&pool, form, "weight form: Luna, weight 280, =Processed=", ts(1, 12, 0)).await;

    let rows = AuditTrailRepo::list_weight_updates_since(&pool, ts(1, 0, 0))
        .await
        .unwrap();
    let dates: Vec<NaiveDateTime> = rows.iter().map(|r| r.auditdate).collect();
    assert_eq!(dates, vec![ts(1, 9, 0), ts(2, 9, 0)]);

    let later = AuditTrailRepo::list_weight_updates_since(&pool, ts(1, 9, 0))
        .await
        .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].auditdate, ts(2, 9, 0));
}

// ---------------------------------------------------------------------------
// Transactional apply
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn apply_update_writes_animal_history_and_cursor(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();

    let applied = WeightHistoryRepo::apply_update(
        &pool,
        &update(1, 0.25, ts(3, 8, 30)),
        Some(WEIGHT_MONITOR_CURSOR),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(applied.previous_weight, Some(0.5));
    assert_eq!(applied.entry.animalid, 1);
    assert_eq!(applied.entry.weight, 0.25);
    assert_eq!(applied.entry.weight_date, ts(3, 8, 30));
    assert!(applied.entry.created_date.is_some());

    let luna = AnimalRepo::find_by_id(&pool, 1).await.unwrap().unwrap();
    assert_eq!(luna.weight, Some(0.25));

    let history = WeightHistoryRepo::list_for_animal(&pool, 1).await.unwrap();
    assert_eq!(history.len(), 1);

    let cursor = MonitorCursorRepo::find(&pool, WEIGHT_MONITOR_CURSOR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cursor.last_auditdate, ts(3, 8, 30));
    assert_eq!(
        WeightHistoryRepo::latest_weight_date(&pool).await.unwrap(),
        Some(ts(3, 8, 30))
    );
}

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn apply_update_for_missing_animal_rolls_back(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();

    let err = WeightHistoryRepo::apply_update(
        &pool,
        &update(99, 0.4, ts(3, 9, 0)),
        Some(WEIGHT_MONITOR_CURSOR),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, sqlx::Error::RowNotFound));

    assert_eq!(history_count(&pool).await, 0);
    assert!(MonitorCursorRepo::find(&pool, WEIGHT_MONITOR_CURSOR)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn replayed_update_is_recognised_and_not_reapplied(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();

    let first = WeightHistoryRepo::apply_update(&pool, &update(2, 0.3, ts(3, 9, 0)), None)
        .await
        .unwrap();
    assert!(first.is_some());
    assert!(MonitorCursorRepo::find(&pool, WEIGHT_MONITOR_CURSOR)
        .await
        .unwrap()
        .is_none());

    // A later update changes the weight; replaying the first must not undo it.
    WeightHistoryRepo::apply_update(&pool, &update(2, 0.4, ts(3, 10, 0)), None)
        .await
        .unwrap();

    let replay = WeightHistoryRepo::apply_update(
        &pool,
        &update(2, 0.3, ts(3, 9, 0)),
        Some(WEIGHT_MONITOR_CURSOR),
    )
    .await
    .unwrap();

    assert!(replay.is_none());
    assert_eq!(history_count(&pool).await, 2);
    let spike = AnimalRepo::find_by_id(&pool, 2).await.unwrap().unwrap();
    assert_eq!(spike.weight, Some(0.4f32 as f64));
    let cursor = MonitorCursorRepo::find(&pool, WEIGHT_MONITOR_CURSOR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cursor.last_auditdate, ts(3, 9, 0));
}

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn history_lists_newest_first(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();

    for (weight, at) in [(0.3, ts(1, 8, 0)), (0.35, ts(2, 8, 0)), (0.4, ts(3, 8, 0))] {
        WeightHistoryRepo::insert(&pool, &update(2, weight, at))
            .await
            .unwrap();
    }

    let dates: Vec<NaiveDateTime> = WeightHistoryRepo::list_for_animal(&pool, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.weight_date)
        .collect();
    assert_eq!(dates, vec![ts(3, 8, 0), ts(2, 8, 0), ts(1, 8, 0)]);
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("host_schema"))]
async fn cursor_never_moves_backwards(pool: PgPool) {
    ensure_weight_monitor_schema(&pool).await.unwrap();

    MonitorCursorRepo::advance(&pool, "test", ts(5, 12, 0)).await.unwrap();
    MonitorCursorRepo::advance(&pool, "test", ts(4, 12, 0)).await.unwrap();
    let cursor = MonitorCursorRepo::find(&pool, "test").await.unwrap().unwrap();
    assert_eq!(cursor.last_auditdate, ts(5, 12, 0));

    MonitorCursorRepo::advance(&pool, "test", ts(6, 12, 0)).await.unwrap();
    let cursor = MonitorCursorRepo::find(&pool, "test").await.unwrap().unwrap();
    assert_eq!(cursor.last_auditdate, ts(6, 12, 0));
}
