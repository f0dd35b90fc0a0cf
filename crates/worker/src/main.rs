use std::process::ExitCode;

use clap::Parser;
use shelter_worker::config::{AsmConfig, ConfigSearch, MonitorConfig};
use shelter_worker::logging;
use shelter_worker::monitor::WeightMonitor;
use tokio_util::sync::CancellationToken;

/// Apply weights from processed online forms to animal records.
#[derive(Debug, Parser)]
#[command(name = "shelter-worker", version)]
struct Cli {
    /// Run a single tick and exit (for cron-style schedulers).
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // --- Tracing ---
    match logging::init_logging() {
        Some(path) => tracing::info!(path = %path.display(), "Logging to file"),
        None => tracing::warn!("No writable log file location, logging to stdout only"),
    }

    // --- Configuration ---
    let asm_config = AsmConfig::load(&ConfigSearch::from_environment());
    let config = MonitorConfig::from_asm_config(&asm_config);
    tracing::info!(db = ?config.db, "Loaded monitor configuration");

    let monitor = WeightMonitor::new(config);

    if cli.once {
        return match monitor.run_once().await {
            Ok(report) => {
                tracing::info!(?report, "Single run complete");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Single run failed");
                ExitCode::FAILURE
            }
        };
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    monitor.run_continuous(cancel).await;
    tracing::info!("Weight monitor stopped");
    ExitCode::SUCCESS
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping after current tick"),
        () = terminate => tracing::info!("Received SIGTERM, stopping after current tick"),
    }
}
