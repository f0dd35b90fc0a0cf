/// Primary keys in the host application's tables are PostgreSQL INTEGER.
pub type DbId = i32;

/// The host application stores `TIMESTAMP` columns without a time zone.
pub type Timestamp = chrono::NaiveDateTime;
