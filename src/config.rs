//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (UPLOAD_GATEWAY__*)
//! 4. Conventional deployment variables (GOOGLE_CLOUD_PROJECT, GCS_*, ...)

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;

/// Bucket used when none is configured
pub const DEFAULT_BUCKET: &str = "bank-ai-documents";

/// Default per-file upload cap (10 MiB)
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Unprefixed variables used by existing deployments, mapped onto config keys.
///
/// These win over every other source.
const CONVENTIONAL_ENV: &[(&str, &str)] = &[
    ("APP_ENV", "gcs.environment"),
    ("GOOGLE_CLOUD_PROJECT", "gcs.project_id"),
    ("GCS_BUCKET_NAME", "gcs.bucket"),
    ("GCS_KEY_SECRET", "gcs.key_secret"),
    ("GCS_KEYFILE_PATH", "gcs.keyfile_path"),
    ("GOOGLE_CLIENT_EMAIL", "gcs.client_email"),
    ("GOOGLE_PRIVATE_KEY", "gcs.private_key"),
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gcs: GcsConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Deadline applied to every inbound request
    pub request_timeout_seconds: u64,
}

/// Google Cloud Storage and credential settings
#[derive(Clone, Deserialize)]
pub struct GcsConfig {
    /// Runtime environment flag ("production" enables workload identity)
    pub environment: String,
    /// Cloud project identifier
    pub project_id: Option<String>,
    /// Bucket every operation targets
    pub bucket: String,
    /// Secret Manager secret holding a service account key JSON
    pub key_secret: Option<String>,
    /// Service account key file for local development
    pub keyfile_path: Option<PathBuf>,
    /// Service account email (production fallback only)
    pub client_email: Option<String>,
    /// Service account private key, PEM (production fallback only)
    pub private_key: Option<String>,
    /// Upload objects with the `publicRead` predefined ACL
    pub public_read: bool,
    /// Storage JSON API base URL
    pub endpoint: String,
    /// Secret Manager REST API base URL
    pub secret_manager_endpoint: String,
}

impl GcsConfig {
    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn project_id(&self) -> Option<&str> {
        non_empty(&self.project_id)
    }

    pub fn key_secret(&self) -> Option<&str> {
        non_empty(&self.key_secret)
    }

    pub fn client_email(&self) -> Option<&str> {
        non_empty(&self.client_email)
    }

    pub fn private_key(&self) -> Option<&str> {
        non_empty(&self.private_key)
    }

    pub fn keyfile_path(&self) -> Option<&std::path::Path> {
        self.keyfile_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

// Hand-written so the private key never reaches a log line.
impl std::fmt::Debug for GcsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsConfig")
            .field("environment", &self.environment)
            .field("project_id", &self.project_id)
            .field("bucket", &self.bucket)
            .field("key_secret", &self.key_secret)
            .field("keyfile_path", &self.keyfile_path)
            .field("client_email", &self.client_email)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("public_read", &self.public_read)
            .field("endpoint", &self.endpoint)
            .field("secret_manager_endpoint", &self.secret_manager_endpoint)
            .finish()
    }
}

/// Upload endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted size of the `file` part
    pub max_file_bytes: usize,
    /// Report missing objects as 404 instead of a generic 500
    pub expose_not_found: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from files and the process environment
    ///
    /// # Errors
    /// Returns `AppError::Configuration` if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::load`], reading conventional variables through `lookup`
    pub fn load_with<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_seconds", 30)?
            .set_default("gcs.environment", "development")?
            .set_default("gcs.bucket", DEFAULT_BUCKET)?
            .set_default("gcs.public_read", false)?
            .set_default("gcs.endpoint", "https://storage.googleapis.com")?
            .set_default(
                "gcs.secret_manager_endpoint",
                "https://secretmanager.googleapis.com",
            )?
            .set_default("upload.max_file_bytes", DEFAULT_MAX_FILE_BYTES as i64)?
            .set_default("upload.expose_not_found", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("UPLOAD_GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            );

        // A blank variable counts as unset and keeps the lower layers.
        for &(variable, key) in CONVENTIONAL_ENV {
            let value = lookup(variable).filter(|value| !value.trim().is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        let app_config: Self = builder.build()?.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.gcs.bucket.trim().is_empty() {
            return Err(AppError::Configuration(
                "gcs.bucket must not be empty".to_string(),
            ));
        }

        if self.gcs.environment.trim().is_empty() {
            return Err(AppError::Configuration(
                "gcs.environment must not be empty".to_string(),
            ));
        }

        if self.upload.max_file_bytes == 0 {
            return Err(AppError::Configuration(
                "upload.max_file_bytes must be greater than 0".to_string(),
            ));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "server.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(AppError::Configuration(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {:?})",
                self.logging.level
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Configuration(format!(
                "logging.format must be \"pretty\" or \"json\" (got {:?})",
                self.logging.format
            )));
        }

        validate_endpoint("gcs.endpoint", &self.gcs.endpoint)?;
        validate_endpoint(
            "gcs.secret_manager_endpoint",
            &self.gcs.secret_manager_endpoint,
        )?;

        Ok(())
    }
}

fn validate_endpoint(key: &str, value: &str) -> Result<(), AppError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| AppError::Configuration(format!("{key} is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Configuration(format!(
            "{key} must use http or https"
        )));
    }

    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
