use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use progression_queue::api::task_routes;
use progression_queue::config::Config;
use progression_queue::logging::init_logging;
use progression_queue::tasks::{TaskStatus, TaskStore};
use progression_queue::worker::WorkerPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_logging(config.log_profile)?;
    info!(?config, "Service config");

    let shutdown = CancellationToken::new();

    // ── Core ────────────────────────────────────────────────────────────
    let store = TaskStore::new(shutdown.clone());
    let pool = WorkerPool::start(Arc::clone(&store), config.pool_config(), &shutdown);

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = task_routes(store.clone());
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(host = %config.host, port = config.port, "Server started");

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    wait_for_signal().await;
    info!("Shutting down");
    shutdown.cancel();

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "Server task panicked"),
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Server forced to shutdown"
        ),
    }

    pool.stop().await;

    let records = store.snapshot().await;
    let count = |status: TaskStatus| records.iter().filter(|t| t.status == status).count();
    info!(
        queued = count(TaskStatus::Queued),
        completed = count(TaskStatus::Completed),
        aborted = count(TaskStatus::Aborted),
        "Service stopped"
    );
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
