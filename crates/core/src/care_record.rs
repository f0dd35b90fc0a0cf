//! Care record rules for the hedgehog care-log server.
//!
//! A care record is an arbitrary JSON object submitted by the care form.
//! The only field the server relies on is [`SUBJECT_FIELD`]; everything
//! else is stored verbatim.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Field naming the hedgehog a record belongs to.
pub const SUBJECT_FIELD: &str = "hedgehog";

/// Field added by the server with the ISO-8601 receive time.
pub const SERVER_TIMESTAMP_FIELD: &str = "server_timestamp";

/// Field added by the server with the second-granularity submission id.
pub const SUBMISSION_ID_FIELD: &str = "submission_id";

/// Filename prefix for persisted records.
const FILE_PREFIX: &str = "care_";

/// Filename extension for persisted records.
pub const FILE_EXTENSION: &str = ".json";

/// A decoded care record.
pub type CareRecord = Map<String, Value>;

/// Decode a request body into a care record.
///
/// The body must be valid UTF-8 JSON and its top level must be an object.
pub fn parse_record(body: &[u8]) -> Result<CareRecord, CoreError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| CoreError::Parse(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Return the subject name of a record.
///
/// The name becomes part of a filename, so it must be a non-empty string
/// that cannot escape the data directory.
pub fn subject_name(record: &CareRecord) -> Result<&str, CoreError> {
    let name = match record.get(SUBJECT_FIELD) {
        None => {
            return Err(CoreError::Validation(format!(
                "missing required field '{SUBJECT_FIELD}'"
            )))
        }
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(CoreError::Validation(format!(
                "'{SUBJECT_FIELD}' must be a string, got {}",
                json_kind(other)
            )))
        }
    };

    if name.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "'{SUBJECT_FIELD}' must not be empty"
        )));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(CoreError::Validation(format!(
            "'{SUBJECT_FIELD}' contains a path separator: {name}"
        )));
    }
    Ok(name)
}

/// Server-side identifiers attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionStamp {
    pub server_timestamp: String,
    pub submission_id: String,
}

impl SubmissionStamp {
    /// Build the stamp for a submission received at `now` (local time).
    ///
    /// The id has second granularity, so two submissions in the same second
    /// share it.
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            server_timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            submission_id: now.format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    /// Write the stamp fields into `record`, replacing any client values.
    pub fn apply(&self, record: &mut CareRecord) {
        record.insert(
            SERVER_TIMESTAMP_FIELD.to_string(),
            Value::String(self.server_timestamp.clone()),
        );
        record.insert(
            SUBMISSION_ID_FIELD.to_string(),
            Value::String(self.submission_id.clone()),
        );
    }
}

/// Filename for a record: `care_{subject}_{submission_id}.json`.
pub fn record_filename(subject: &str, submission_id: &str) -> String {
    format!("{FILE_PREFIX}{subject}_{submission_id}{FILE_EXTENSION}")
}

/// Whether a directory entry is a persisted record.
pub fn is_record_file(filename: &str) -> bool {
    filename.ends_with(FILE_EXTENSION)
}

/// Whether a record file belongs to `subject`.
///
/// Case-insensitive substring match on the filename, so "spike" matches
/// both `care_Spike_...` and `care_Spikey_...`.
pub fn filename_matches_subject(filename: &str, subject: &str) -> bool {
    is_record_file(filename) && filename.to_lowercase().contains(&subject.to_lowercase())
}

/// Sort records by `server_timestamp`, newest first.
///
/// Records without a string timestamp sort as the empty string (last).
pub fn sort_newest_first(records: &mut [CareRecord]) {
    records.sort_by(|a, b| compare_timestamps(b, a));
}

fn compare_timestamps(a: &CareRecord, b: &CareRecord) -> Ordering {
    let key = |r: &CareRecord| {
        r.get(SERVER_TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned()
    };
    key(a).cmp(&key(b))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
