//! Hedgehog care-log server library.
//!
//! Exposes config, state, the record store, error handling and routes so
//! integration tests and the binary entrypoint build the same router.

pub mod config;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;
pub mod store;
