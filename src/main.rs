use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use csv_viewer::{config::Config, routes::create_router, utils::init_logger, AppState, MemoryStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // The one dataset store, shared by every request
    let state = AppState {
        store: Arc::new(MemoryStorage::new()),
        config: config.clone(),
    };

    let app = create_router(state);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Server listening on {}", listener.local_addr()?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => {
            result?.map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Shutting down...");
            let _ = shutdown_tx.send(());
        }
    }

    let deadline = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(deadline, &mut server).await {
        Ok(result) => result?.map_err(|e| anyhow::anyhow!("Server error: {}", e))?,
        Err(_) => {
            warn!("Graceful shutdown timed out after {:?}", deadline);
            server.abort();
        }
    }

    info!("Server has stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler, only Ctrl-C will stop the server: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}
