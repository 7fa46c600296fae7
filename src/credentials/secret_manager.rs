//! Secret Manager access
//!
//! Reads the latest version of a secret over the REST API, authorized with
//! the ambient identity.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use gcp_auth::TokenProvider;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::SecretSource;
use crate::error::AppError;

const SECRET_MANAGER_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Resource name of the newest version of a secret
pub fn secret_version_name(project_id: &str, secret: &str) -> String {
    format!("projects/{project_id}/secrets/{secret}/versions/latest")
}

pub struct SecretManagerClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: OnceCell<Arc<dyn TokenProvider>>,
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: Option<String>,
}

impl SecretManagerClient {
    pub fn new(http: reqwest::Client, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            tokens: OnceCell::new(),
        }
    }

    async fn token_provider(&self) -> Result<&Arc<dyn TokenProvider>, AppError> {
        self.tokens
            .get_or_try_init(|| async {
                gcp_auth::provider().await.map_err(|e| {
                    AppError::Authentication(format!(
                        "no ambient credentials for Secret Manager: {e}"
                    ))
                })
            })
            .await
    }
}

#[async_trait]
impl SecretSource for SecretManagerClient {
    async fn access_latest(&self, project_id: &str, secret: &str) -> Result<Vec<u8>, AppError> {
        let name = secret_version_name(project_id, secret);
        let token = self
            .token_provider()
            .await?
            .token(SECRET_MANAGER_SCOPES)
            .await
            .map_err(|e| AppError::Authentication(format!("failed to obtain access token: {e}")))?;

        tracing::debug!(secret = %name, "Accessing secret version");

        let response = self
            .http
            .get(format!("{}/v1/{}:access", self.endpoint, name))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Secret Manager request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AppError::Authentication(format!("cannot access {name} ({status}): {body}"))
                }
                _ => AppError::Upstream(format!(
                    "Secret Manager access failed ({status}): {body}"
                )),
            });
        }

        let body: AccessSecretVersionResponse = response.json().await.map_err(|e| {
            AppError::Authentication(format!("malformed Secret Manager response: {e}"))
        })?;

        decode_payload(body)
    }
}

fn decode_payload(response: AccessSecretVersionResponse) -> Result<Vec<u8>, AppError> {
    let data = response
        .payload
        .and_then(|payload| payload.data)
        .ok_or_else(|| AppError::Authentication("secret payload is empty".to_string()))?;

    STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::Authentication(format!("secret payload is not base64: {e}")))
}
