//! Object storage for chat memory documents and generated images
//!
//! Two backends implement [`ObjectStore`]:
//! - [`S3Store`]: S3-compatible API (MinIO, AWS) through `aws-sdk-s3`
//! - [`InMemoryStore`]: process-local map, for development runs and tests

mod memory;
mod s3;

pub use memory::InMemoryStore;
pub use s3::{S3Store, S3StoreConfig};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// Expiry used for every presigned retrieval URL (7 days, the S3 maximum)
pub const PRESIGNED_URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Metadata for a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Bucket/key object storage
///
/// Deleting a key that does not exist is not an error for S3-compatible
/// stores; callers that care must `stat_object` first.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns error if the bucket cannot be checked or created
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    /// Store `data` under `key`, replacing any existing object
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str)
    -> Result<()>;

    /// Fetch the full contents of an object
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Fetch object metadata without the body
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the key does not exist
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    /// Remove an object
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the request
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// List every object in a bucket
    ///
    /// # Errors
    ///
    /// Returns error if the listing fails
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>>;

    /// Build a time-limited GET URL for an object
    ///
    /// # Errors
    ///
    /// Returns error if the URL cannot be signed
    async fn presigned_get_url(&self, bucket: &str, key: &str, expires: Duration)
    -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
