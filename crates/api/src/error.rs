use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Every failure is reported to the care form as a 500 with a plain-text
/// body; the variant picks the message prefix.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Submitting a record failed (bad body, missing hedgehog, write error).
    #[error("Server Error: {0}")]
    Submit(#[source] StoreError),

    /// Listing every record failed.
    #[error("Error retrieving records: {0}")]
    ListAll(#[source] StoreError),

    /// Listing one hedgehog's records failed.
    #[error("Error retrieving hedgehog records: {0}")]
    ListSubject(#[source] StoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
