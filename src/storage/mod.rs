//! Google Cloud Storage module
//!
//! Handles:
//! - The object store handle (GCS JSON API, or in-process for tests)
//! - The bucket facade used by the HTTP layer

mod cloud;
mod gcs;
mod memory;

pub use cloud::CloudStorage;
pub use gcs::{GcsConnector, GcsObjectStore};
pub use memory::{MemoryObjectStore, StoredObject};

use async_trait::async_trait;

use crate::error::AppError;

/// Base of the URLs handed back to clients after an upload
pub const PUBLIC_URL_BASE: &str = "https://storage.googleapis.com";

/// Content type used when the client did not send one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Access policy applied to newly written objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    /// Inherit the bucket's default ACL
    BucketDefault,
    /// `publicRead` predefined ACL
    PublicRead,
}

impl ObjectAcl {
    pub fn from_public_read(public_read: bool) -> Self {
        if public_read {
            ObjectAcl::PublicRead
        } else {
            ObjectAcl::BucketDefault
        }
    }
}

/// Authenticated handle to an object storage service
///
/// Bound to one project and one set of credentials. Shared read-only by
/// every in-flight request once created.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Connectivity check: list buckets in the project and return how many came back
    async fn probe(&self) -> Result<usize, AppError>;

    /// Write an object, replacing any existing object of the same name
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
        acl: ObjectAcl,
    ) -> Result<(), AppError>;

    /// Read an object's bytes
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, AppError>;

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), AppError>;

    /// Object names in service order, optionally filtered by prefix
    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, AppError>;
}

/// Public-style URL for an object
///
/// This is a construction only: the object is readable at this URL only
/// when the bucket or object ACL allows anonymous reads.
pub fn public_url(bucket: &str, filename: &str) -> String {
    format!("{}/{}/{}", PUBLIC_URL_BASE, bucket, filename)
}
