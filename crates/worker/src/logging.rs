//! Tracing setup for the weight monitor.
//!
//! Logs always go to stdout. A copy goes to the first log file that can be
//! opened for appending; if none can, the monitor runs with stdout only.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file locations, most preferred first.
pub const LOG_FILE_CANDIDATES: &[&str] = &[
    "/tmp/weight_monitor.log",
    "/var/log/weight_monitor.log",
    "./weight_monitor.log",
];

const DEFAULT_LOG_FILTER: &str = "shelter_worker=info,shelter_db=info";

/// Open the first candidate that accepts appends.
pub fn open_first_writable<P: AsRef<Path>>(candidates: &[P]) -> Option<(PathBuf, File)> {
    candidates.iter().find_map(|candidate| {
        let path = candidate.as_ref();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(|file| (path.to_path_buf(), file))
    })
}

/// Install the global subscriber.
///
/// Returns the log file in use, if any. Called once by `main` before
/// anything else logs.
pub fn init_logging() -> Option<PathBuf> {
    let log_file = open_first_writable(LOG_FILE_CANDIDATES);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let (path, file_layer) = match log_file {
        Some((path, file)) => (
            Some(path),
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            ),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .init();

    path
}
