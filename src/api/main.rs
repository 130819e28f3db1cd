use anyhow::Context;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use flows_api::middleware::{LogFormat, create_cors_layer, init_tracing};
use flows_api::routes::{AppConfig, AppState, create_app};
use flows_api::storage::session_store::start_session_cleanup_task;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());
    info!("Application starting...");

    let config = AppConfig::from_env();
    if config.shopify_shop.is_none() || config.shopify_access_token.is_none() {
        info!("Shopify credentials not configured; catalog calls will fail with 503");
    }

    let app_state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state")?;

    let session_ttl = chrono::Duration::from_std(config.session_ttl)
        .context("RUN_SESSION_TTL_SECS out of range")?;
    tokio::spawn(start_session_cleanup_task(
        app_state.runs.sessions().clone(),
        session_ttl,
    ));

    let shutdown = app_state.shutdown.clone();
    let app = create_app(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors_origins)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind listener on {addr}"))?;
    info!("Server listening on {} (port {})", addr, config.port);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel in-flight generation.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
    shutdown.cancel();
}
