//! Upload Gateway - a minimal HTTP upload gateway in front of a Google Cloud Storage bucket
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Multipart upload, list, download, delete                 │
//! │  - Health / readiness / metrics                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Storage Facade                           │
//! │  - Single bucket, initialized once                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Credential Resolver                        │
//! │  - Workload identity / Secret Manager / key file            │
//! │  - Connectivity probe before first use                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `storage`: Object store handles and the bucket facade
//! - `credentials`: Credential strategy selection and key handling
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

/// Timeout applied to every outbound call to Google APIs
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Bucket facade
    pub storage: Arc<storage::CloudStorage>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the outbound HTTP client
    /// 2. Wire the GCS connector and Secret Manager client into a resolver
    /// 3. Resolve credentials and probe the bucket service
    ///
    /// # Errors
    /// Returns the resolver's error when no credential strategy succeeds
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("upload-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(OUTBOUND_TIMEOUT)
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let resolver = credentials::CredentialResolver::new(
            Arc::new(storage::GcsConnector::new(
                http_client.clone(),
                &config.gcs.endpoint,
            )),
            Arc::new(credentials::SecretManagerClient::new(
                http_client,
                &config.gcs.secret_manager_endpoint,
            )),
        );

        let storage = storage::CloudStorage::new(&config.gcs);
        let strategy = storage.initialize(&resolver, &config.gcs).await?;

        tracing::info!(
            strategy = %strategy,
            bucket = %storage.bucket(),
            "Application state initialized successfully"
        );

        Ok(Self::with_storage(config, storage))
    }

    /// Assemble state around an existing facade
    pub fn with_storage(config: config::AppConfig, storage: storage::CloudStorage) -> Self {
        Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::routing::get;
    use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .merge(api::upload_router(state.config.upload.max_file_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

/// 200 once the storage handle is installed, 503 before
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::response::Response {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    match state.storage.strategy() {
        Some(strategy) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "status": "ready",
                "strategy": strategy.to_string(),
                "bucket": state.storage.bucket(),
            })),
        )
            .into_response(),
        None => error::AppError::NotReady.into_response(),
    }
}
