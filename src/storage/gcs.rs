//! Google Cloud Storage over the JSON API
//!
//! Requests are authorized with bearer tokens from a `gcp_auth` provider,
//! either the ambient one (workload identity / ADC) or a service account key.

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

use super::{ObjectAcl, ObjectStore};
use crate::credentials::{CredentialBundle, StorageConnector};
use crate::error::AppError;

const GCS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Creates [`GcsObjectStore`] handles from resolved credentials
pub struct GcsConnector {
    http: reqwest::Client,
    endpoint: String,
}

impl GcsConnector {
    pub fn new(http: reqwest::Client, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageConnector for GcsConnector {
    async fn connect(
        &self,
        bundle: &CredentialBundle,
        project_id: Option<&str>,
    ) -> Result<Arc<dyn ObjectStore>, AppError> {
        let tokens: Arc<dyn TokenProvider> = match bundle {
            CredentialBundle::Ambient => gcp_auth::provider().await.map_err(|e| {
                AppError::Authentication(format!("ambient credentials unavailable: {e}"))
            })?,
            CredentialBundle::ServiceAccount(key) => {
                let account = gcp_auth::CustomServiceAccount::from_json(&key.to_credentials_json())
                    .map_err(|e| {
                        AppError::Configuration(format!("invalid service account key: {e}"))
                    })?;
                Arc::new(account) as Arc<dyn TokenProvider>
            }
        };

        let project_id = match project_id {
            Some(project_id) => project_id.to_string(),
            None => tokens
                .project_id()
                .await
                .map(|project_id| project_id.to_string())
                .map_err(|e| {
                    AppError::Configuration(format!(
                        "project id is not configured and could not be discovered: {e}"
                    ))
                })?,
        };

        tracing::debug!(project_id = %project_id, endpoint = %self.endpoint, "GCS client created");

        Ok(Arc::new(GcsObjectStore {
            http: self.http.clone(),
            tokens,
            project_id,
            endpoint: self.endpoint.clone(),
        }))
    }
}

/// GCS handle bound to a project and a token provider
pub struct GcsObjectStore {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    project_id: String,
    /// e.g., "https://storage.googleapis.com"
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

impl GcsObjectStore {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn bearer(&self) -> Result<Arc<gcp_auth::Token>, AppError> {
        self.tokens
            .token(GCS_SCOPES)
            .await
            .map_err(|e| AppError::Authentication(format!("failed to obtain access token: {e}")))
    }

    fn object_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            urlencoding::encode(bucket),
            urlencoding::encode(name)
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
        subject: &str,
    ) -> Result<reqwest::Response, AppError> {
        let token = self.bearer().await?;
        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GCS {operation} request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => AppError::NotFound(subject.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Authentication(format!("GCS {operation} rejected ({status}): {body}"))
            }
            _ => AppError::Upstream(format!("GCS {operation} failed ({status}): {body}")),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn probe(&self) -> Result<usize, AppError> {
        let request = self
            .http
            .get(format!("{}/storage/v1/b", self.endpoint))
            .query(&[
                ("project", self.project_id.as_str()),
                ("fields", "items(name),nextPageToken"),
            ]);

        let buckets: BucketList = self
            .send(request, "list buckets", &self.project_id)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid bucket listing: {e}")))?;

        Ok(buckets.items.len())
    }

    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
        acl: ObjectAcl,
    ) -> Result<(), AppError> {
        let mut request = self
            .http
            .post(format!(
                "{}/upload/storage/v1/b/{}/o",
                self.endpoint,
                urlencoding::encode(bucket)
            ))
            .query(&[("uploadType", "media"), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);

        if acl == ObjectAcl::PublicRead {
            request = request.query(&[("predefinedAcl", "publicRead")]);
        }

        self.send(request, "upload", name).await?;
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, AppError> {
        let request = self
            .http
            .get(self.object_url(bucket, name))
            .query(&[("alt", "media")]);

        let bytes = self
            .send(request, "download", name)
            .await?
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(format!("GCS download interrupted: {e}")))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), AppError> {
        let request = self.http.delete(self.object_url(bucket, name));
        self.send(request, "delete", name).await?;
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, AppError> {
        let url = format!(
            "{}/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(bucket)
        );
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("fields", "items(name),nextPageToken")]);
            if let Some(prefix) = prefix {
                request = request.query(&[("prefix", prefix)]);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ObjectList = self
                .send(request, "list objects", bucket)
                .await?
                .json()
                .await
                .map_err(|e| AppError::Upstream(format!("invalid object listing: {e}")))?;

            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }
}
