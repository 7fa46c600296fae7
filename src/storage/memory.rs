//! In-process object store
//!
//! Same semantics as the GCS handle (last write wins, missing objects are
//! `NotFound`) without any network. Listing is ordered by name.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{ObjectAcl, ObjectStore};
use crate::error::AppError;

/// A stored object with the metadata it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub acl: ObjectAcl,
}

/// Bucket name -> object name -> object
type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<Buckets>,
    reject_probe: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose connectivity probe always fails, as with rejected credentials
    pub fn rejecting_probe() -> Self {
        Self {
            buckets: RwLock::default(),
            reject_probe: true,
        }
    }

    /// Inspect an object without going through the trait
    pub async fn object(&self, bucket: &str, name: &str) -> Option<StoredObject> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn probe(&self) -> Result<usize, AppError> {
        if self.reject_probe {
            return Err(AppError::Authentication(
                "probe rejected by in-memory store".to_string(),
            ));
        }
        Ok(self.buckets.read().await.len())
    }

    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
        acl: ObjectAcl,
    ) -> Result<(), AppError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(
                name.to_string(),
                StoredObject {
                    data,
                    content_type: content_type.to_string(),
                    acl,
                },
            );
        Ok(())
    }

    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, AppError> {
        self.object(bucket, name)
            .await
            .map(|object| object.data)
            .ok_or_else(|| AppError::NotFound(name.to_string()))
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<(), AppError> {
        self.buckets
            .write()
            .await
            .get_mut(bucket)
            .and_then(|objects| objects.remove(name))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(name.to_string()))
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, AppError> {
        let buckets = self.buckets.read().await;
        let Some(objects) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };

        Ok(objects
            .keys()
            .filter(|name| prefix.is_none_or(|prefix| name.starts_with(prefix)))
            .cloned()
            .collect())
    }
}
