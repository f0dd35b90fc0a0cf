//! Handlers for care record submission and read-back.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use shelter_core::care_record::{parse_record, subject_name, CareRecord};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::StoreError;

/// Response body for `POST /submit_care`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub submission_id: String,
    pub filename: String,
}

/// POST /submit_care
///
/// The body is decoded by hand rather than with `Json<_>` so malformed
/// input gets the same plain-text 500 as every other failure.
async fn submit_care(State(state): State<AppState>, body: Bytes) -> AppResult<Json<SubmitResponse>> {
    let invalid = |e| AppError::Submit(StoreError::Core(e));
    let record = parse_record(&body).map_err(invalid)?;
    let hedgehog = subject_name(&record).map_err(invalid)?.to_owned();

    let submission = state.store.submit(record).await.map_err(AppError::Submit)?;

    Ok(Json(SubmitResponse {
        success: true,
        message: format!("Care record for {hedgehog} saved successfully"),
        submission_id: submission.submission_id,
        filename: submission.filename,
    }))
}

/// GET /api/care_records
async fn list_care_records(State(state): State<AppState>) -> AppResult<Json<Vec<CareRecord>>> {
    let records = state.store.list_all().await.map_err(AppError::ListAll)?;
    Ok(Json(records))
}

/// GET /api/hedgehog/{name}
async fn list_hedgehog_records(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<CareRecord>>> {
    let records = state
        .store
        .list_for_subject(&name)
        .await
        .map_err(AppError::ListSubject)?;
    Ok(Json(records))
}

/// Route tree:
///
/// ```text
/// POST /submit_care            store one record
/// GET  /api/care_records       every record, newest first
/// GET  /api/hedgehog/{name}    records whose filename contains {name}
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit_care", post(submit_care))
        .route("/api/care_records", get(list_care_records))
        .route("/api/hedgehog/{name}", get(list_hedgehog_records))
}
