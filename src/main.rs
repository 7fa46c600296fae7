//! Upload Gateway binary entry point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_gateway::{AppState, config};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from files and environment
/// 2. Initialize tracing/logging from `logging.level` / `logging.format`
/// 3. Initialize metrics
/// 4. Resolve storage credentials (fails fast before binding)
/// 5. Build Axum router
/// 6. Serve until Ctrl-C / SIGTERM
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG still wins when set
    let default_filter = format!("upload_gateway={},tower_http=debug", config.logging.level);

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Upload Gateway...");
    tracing::info!(
        environment = %config.gcs.environment,
        bucket = %config.gcs.bucket,
        public_read = config.gcs.public_read,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    upload_gateway::metrics::init_metrics();

    // 4. Initialize application state
    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(error) => {
            tracing::error!(%error, "Failed to initialize Google Cloud Storage");
            return Err(error.into());
        }
    };

    // 5. Build Axum router
    let app = upload_gateway::build_router(state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
