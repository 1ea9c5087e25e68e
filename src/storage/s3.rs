//! S3-compatible object store client (MinIO, AWS S3)
//!
//! Wraps `aws-sdk-s3` with path-style addressing and static credentials.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ObjectInfo, ObjectStore};
use crate::{Error, Result};

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    /// `host:port`, or a full URL with scheme
    pub endpoint: String,
    pub access_key: SecretString,
    pub secret_key: SecretString,
    pub region: String,
    /// Use https when `endpoint` carries no scheme
    pub secure: bool,
}

/// S3-compatible object store
pub struct S3Store {
    client: Client,
    endpoint: String,
    region: String,
}

/// Add a scheme to a bare `host:port` endpoint and validate it
fn endpoint_url(endpoint: &str, secure: bool) -> Result<String> {
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{endpoint}")
    };
    let url = Url::parse(&raw)
        .map_err(|e| Error::Config(format!("invalid storage endpoint {raw:?}: {e}")))?;
    if url.host_str().is_none() {
        return Err(Error::Config(format!("storage endpoint has no host: {raw}")));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn storage_error<E: std::error::Error>(what: &str, err: &E) -> Error {
    Error::Storage(format!("{what}: {}", DisplayErrorContext(err)))
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

impl S3Store {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not a valid host or URL
    pub fn new(config: S3StoreConfig) -> Result<Self> {
        let endpoint = endpoint_url(&config.endpoint, config.secure)?;
        let credentials = Credentials::new(
            config.access_key.expose_secret(),
            config.secret_key.expose_secret(),
            None,
            None,
            "tweetgen",
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            endpoint,
            region: config.region,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket, "bucket already exists");
                return Ok(());
            }
            Err(err) if err.as_service_error().is_some_and(HeadBucketError::is_not_found) => {}
            Err(err) => return Err(storage_error(&format!("checking bucket {bucket}"), &err)),
        }

        tracing::info!(bucket, "creating bucket");
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| storage_error(&format!("creating bucket {bucket}"), &e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| storage_error(&format!("uploading /{bucket}/{key}"), &e))?;
        tracing::debug!(bucket, key, size, "uploaded object");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) => {
                return Err(Error::NotFound(format!("/{bucket}/{key}")));
            }
            Err(err) => return Err(storage_error(&format!("fetching /{bucket}/{key}"), &err)),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("reading /{bucket}/{key}: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let output = match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(HeadObjectError::is_not_found) => {
                return Err(Error::NotFound(format!("/{bucket}/{key}")));
            }
            Err(err) => return Err(storage_error(&format!("stat /{bucket}/{key}"), &err)),
        };

        Ok(ObjectInfo {
            key: key.to_string(),
            size: output
                .content_length()
                .and_then(|len| u64::try_from(len).ok())
                .unwrap_or(0),
            last_modified: output.last_modified().and_then(to_chrono),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(&format!("deleting /{bucket}/{key}"), &e))?;
        tracing::debug!(bucket, key, "deleted object");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| storage_error(&format!("listing {bucket}"), &e))?;
            objects.extend(page.contents().iter().filter_map(|object| {
                Some(ObjectInfo {
                    key: object.key()?.to_string(),
                    size: object
                        .size()
                        .and_then(|size| u64::try_from(size).ok())
                        .unwrap_or(0),
                    last_modified: object.last_modified().and_then(to_chrono),
                })
            }));
        }

        Ok(objects)
    }

    async fn presigned_get_url(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        let config = PresigningConfig::expires_in(expires)
            .map_err(|e| Error::Storage(format!("invalid presign expiry: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| storage_error(&format!("presigning /{bucket}/{key}"), &e))?;
        Ok(request.uri().to_string())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
