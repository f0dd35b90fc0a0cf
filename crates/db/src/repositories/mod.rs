//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods that take part in the monitor's apply transaction accept any
//! [`sqlx::postgres::PgExecutor`], so they run equally against `&PgPool` or
//! `&mut *tx`.

pub mod animal_repo;
pub mod audit_trail_repo;
pub mod monitor_cursor_repo;
pub mod weight_history_repo;

pub use animal_repo::AnimalRepo;
pub use audit_trail_repo::AuditTrailRepo;
pub use monitor_cursor_repo::MonitorCursorRepo;
pub use weight_history_repo::WeightHistoryRepo;
