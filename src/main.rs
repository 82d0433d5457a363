use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use verdant::{app, initialize_state};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (state, mail_worker) = initialize_state().await?;

    let port = state.config.port.unwrap_or(DEFAULT_PORT);
    let listener =
        tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await?;

    tracing::info!(%port, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router is gone, so the dispatch queue is closed; wait for the
    // worker to drain mails queued by in-flight requests.
    mail_worker.await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
