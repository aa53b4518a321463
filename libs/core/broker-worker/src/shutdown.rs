//! Process shutdown wiring: OS signals to registry-wide exit.

use crate::registry::WorkerRegistry;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

/// Spawn a task that closes every registered worker when a shutdown signal
/// arrives. Resolves with the coordinator's overall result.
pub fn spawn_exit_handler(registry: Arc<WorkerRegistry>) -> JoinHandle<bool> {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing workers");
        let clean = registry.exit_cleanly().await;
        if !clean {
            error!("One or more workers failed to exit cleanly");
        }
        clean
    })
}
