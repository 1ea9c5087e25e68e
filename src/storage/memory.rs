//! In-process object store

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ObjectInfo, ObjectStore};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Object store kept entirely in memory
///
/// Buckets are created on first write. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `bucket/key` currently exists
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::NotFound(format!("/{bucket}/{key}")))
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| ObjectInfo {
                key: key.to_string(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .ok_or_else(|| Error::NotFound(format!("/{bucket}/{key}")))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let removed = self
            .buckets
            .write()
            .await
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key));
        if removed.is_none() {
            tracing::debug!(bucket, key, "delete of missing object");
        }
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(key, object)| ObjectInfo {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        last_modified: Some(object.last_modified),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn presigned_get_url(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        Ok(format!(
            "memory://{bucket}/{key}?expires={}",
            expires.as_secs()
        ))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
