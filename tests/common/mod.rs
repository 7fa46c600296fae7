//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use tokio::net::TcpListener;
use upload_gateway::credentials::CredentialStrategy;
use upload_gateway::storage::{CloudStorage, MemoryObjectStore, ObjectAcl};
use upload_gateway::{AppState, config};

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: Arc<MemoryObjectStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a test server backed by an in-memory bucket
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test server with a customized configuration
    pub async fn with_config(config: config::AppConfig) -> Self {
        let store = Arc::new(MemoryObjectStore::new());
        let storage = CloudStorage::with_store(
            config.gcs.bucket.clone(),
            ObjectAcl::from_public_read(config.gcs.public_read),
            CredentialStrategy::LocalKeyFile,
            store.clone(),
        );

        Self::serve(AppState::with_storage(config, storage), store).await
    }

    /// Create a test server whose storage was never initialized
    pub async fn not_ready() -> Self {
        let config = test_config();
        let storage = CloudStorage::new(&config.gcs);

        Self::serve(
            AppState::with_storage(config, storage),
            Arc::new(MemoryObjectStore::new()),
        )
        .await
    }

    async fn serve(state: AppState, store: Arc<MemoryObjectStore>) -> Self {
        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = upload_gateway::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            store,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a single `file` part to `path`
    pub async fn upload(&self, path: &str, filename: &str, data: &[u8]) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Object names currently in the test bucket
    pub async fn list(&self) -> Vec<String> {
        let body: serde_json::Value = self
            .client
            .get(self.url("/upload/list"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|name| name.as_str().unwrap().to_string())
            .collect()
    }
}

/// Configuration used by every test server
pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            request_timeout_seconds: 30,
        },
        gcs: config::GcsConfig {
            environment: "development".to_string(),
            project_id: Some("test-project".to_string()),
            bucket: "test-bucket".to_string(),
            key_secret: None,
            keyfile_path: None,
            client_email: None,
            private_key: None,
            public_read: false,
            endpoint: "https://storage.googleapis.com".to_string(),
            secret_manager_endpoint: "https://secretmanager.googleapis.com".to_string(),
        },
        upload: config::UploadConfig {
            max_file_bytes: 1024,
            expose_not_found: false,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
