//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the selected columns
//! and, where the monitor writes to the table, a create DTO.

pub mod animal;
pub mod audit_trail;
pub mod monitor_cursor;
pub mod weight_history;
