//! Bucket facade
//!
//! Every operation targets the single configured bucket. The storage handle
//! is created once by [`CloudStorage::initialize`]; until then every
//! operation fails with `AppError::NotReady`.

use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{DEFAULT_CONTENT_TYPE, ObjectAcl, ObjectStore, public_url};
use crate::config::GcsConfig;
use crate::credentials::{CredentialResolver, CredentialStrategy, ResolvedStorage};
use crate::error::AppError;
use crate::metrics::STORAGE_OPERATIONS_TOTAL;

/// Upload/download/delete/list against one bucket
pub struct CloudStorage {
    /// Bucket name
    bucket: String,
    /// ACL applied to uploads
    acl: ObjectAcl,
    /// Set exactly once, by the first successful initialization
    connection: OnceCell<ResolvedStorage>,
}

impl CloudStorage {
    /// Create an uninitialized facade for the configured bucket
    pub fn new(config: &GcsConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            acl: ObjectAcl::from_public_read(config.public_read),
            connection: OnceCell::new(),
        }
    }

    /// Create a facade around an already validated handle
    pub fn with_store(
        bucket: impl Into<String>,
        acl: ObjectAcl,
        strategy: CredentialStrategy,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            acl,
            connection: OnceCell::new_with(Some(ResolvedStorage { strategy, store })),
        }
    }

    /// Resolve credentials and install the handle
    ///
    /// Runs the resolver at most once: concurrent callers wait for the same
    /// attempt, later callers get the stored result. A failed attempt
    /// installs nothing, so the next call tries again.
    pub async fn initialize(
        &self,
        resolver: &CredentialResolver,
        config: &GcsConfig,
    ) -> Result<CredentialStrategy, AppError> {
        let resolved = self
            .connection
            .get_or_try_init(|| resolver.resolve(config))
            .await?;
        Ok(resolved.strategy)
    }

    pub fn is_ready(&self) -> bool {
        self.connection.initialized()
    }

    /// Strategy that produced the handle, once initialized
    pub fn strategy(&self) -> Option<CredentialStrategy> {
        self.connection.get().map(|resolved| resolved.strategy)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public-style URL for `filename` in this bucket
    pub fn public_url(&self, filename: &str) -> String {
        public_url(&self.bucket, filename)
    }

    fn store(&self) -> Result<&Arc<dyn ObjectStore>, AppError> {
        self.connection
            .get()
            .map(|resolved| &resolved.store)
            .ok_or(AppError::NotReady)
    }

    /// Upload a file, overwriting any object of the same name
    ///
    /// # Returns
    /// `https://storage.googleapis.com/{bucket}/{filename}`, whether or not
    /// the object is publicly readable
    pub async fn upload(
        &self,
        content: Vec<u8>,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<String, AppError> {
        let size = content.len();
        let result = async {
            self.store()?
                .put(
                    &self.bucket,
                    filename,
                    content,
                    content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
                    self.acl,
                )
                .await
        }
        .await;
        record("upload", &result);
        result?;

        tracing::info!(bucket = %self.bucket, object = %filename, size, "File uploaded");
        Ok(self.public_url(filename))
    }

    pub async fn download(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        let result = async { self.store()?.get(&self.bucket, filename).await }.await;
        record("download", &result);

        let data = result?;
        tracing::debug!(bucket = %self.bucket, object = %filename, size = data.len(), "File downloaded");
        Ok(data)
    }

    pub async fn delete(&self, filename: &str) -> Result<(), AppError> {
        let result = async { self.store()?.delete(&self.bucket, filename).await }.await;
        record("delete", &result);
        result?;

        tracing::info!(bucket = %self.bucket, object = %filename, "File deleted");
        Ok(())
    }

    /// List object names, re-enumerating the bucket on every call
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, AppError> {
        let result = async { self.store()?.list(&self.bucket, prefix).await }.await;
        record("list", &result);

        let files = result?;
        tracing::debug!(bucket = %self.bucket, prefix = ?prefix, count = files.len(), "Files listed");
        Ok(files)
    }
}

fn record<T>(operation: &str, result: &Result<T, AppError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(error) => error.kind(),
    };
    STORAGE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
