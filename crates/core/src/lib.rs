//! Domain rules shared by the shelter care server and the weight monitor.
//!
//! Nothing in this crate performs I/O: it holds the types, validation,
//! naming and parsing logic that the binaries and the database layer
//! build on.

pub mod care_record;
pub mod error;
pub mod types;
pub mod units;
pub mod weight_audit;
