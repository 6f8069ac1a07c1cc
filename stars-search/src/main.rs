//! Stars search engine.
//!
//! Harvests the starred repositories of the GitHub user owning the token on a
//! schedule and serves full-text search over them.

use dotenv::dotenv;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use stars_search::{
    http::{self, AppState},
    logging::{self, LogFormat},
    AppError, Dependencies, Settings,
};

/// Upper bound on the time given to in-flight work after the shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    logging::init(LogFormat::from_env());

    let settings = Settings::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;
    let deps = Dependencies::new(&settings).inspect_err(|e| {
        error!(error = %e, "Failed to initialize dependencies");
    })?;

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    let app = http::router(AppState::new(deps.search.clone(), settings.search_timeout));
    let (server_shutdown_tx, server_shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(http::serve(listener, app, async move {
        let _ = server_shutdown_rx.await;
    }));

    let orchestrator = deps.orchestrator.clone();
    let scheduler = tokio::spawn(async move { orchestrator.run().await });

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    deps.orchestrator.shutdown();
    let _ = server_shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
        Err(_) => warn!("HTTP server did not stop in time"),
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "Scheduler error"),
        Ok(Err(e)) => error!(error = %e, "Scheduler task failed"),
        Err(_) => warn!("Scheduler did not stop in time"),
    }

    info!("Shutdown complete");
    Ok(())
}
