//! OS signal handling and the bounded shutdown drain.

use std::process::ExitCode;
use std::time::Duration;

use tracing::{info, warn};

use crate::services::manager::ServiceManager;

/// Block until SIGINT/SIGTERM, then drain all services within the budget.
pub async fn handle_shutdown_signals(manager: ServiceManager, timeout_secs: u64) -> ExitCode {
    wait_for_signal().await;
    info!("shutdown signal received");

    manager.shutdown();

    match tokio::time::timeout(Duration::from_secs(timeout_secs), manager.join_all()).await {
        Ok(()) => {
            info!("shutdown complete");
            ExitCode::SUCCESS
        }
        Err(_) => {
            warn!(timeout_secs, "shutdown timed out, abandoning remaining tasks");
            ExitCode::FAILURE
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
