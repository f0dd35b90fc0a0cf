//! Weight monitor: applies weights from processed online forms.
//!
//! Each tick scans the host application's audit trail for processed weight
//! forms, parses the animal name and weight out of the description, and
//! writes the weight to the animal and to `animal_weight_history`.

pub mod config;
pub mod logging;
pub mod monitor;
