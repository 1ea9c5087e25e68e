//! Image generation, temporary hosting and retrieval links
//!
//! Generated images live in the image bucket only for a while: every upload
//! schedules its own deletion. Conversation entries keep their URL after the
//! object is gone.

mod pollinations;

pub use pollinations::{DEFAULT_BASE_URL, PollinationsClient};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::history::{ConversationStore, Message};
use crate::storage::{ObjectStore, PRESIGNED_URL_EXPIRY};
use crate::{Error, Result};

/// Default lifetime of a generated image before automatic deletion
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_secs(300);

/// A remote text-to-image service
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for `prompt` and return its encoded bytes
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` on transport errors, non-success
    /// status, or an empty body
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Result of a successful image generation
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub image_url: String,
    #[serde(rename = "uuid")]
    pub id: String,
}

/// A stored image and a link to it
#[derive(Debug, Clone, Serialize)]
pub struct ImageLink {
    #[serde(rename = "uuid")]
    pub id: String,
    pub url: String,
}

/// Object name for an image id
#[must_use]
pub fn object_name(id: &str) -> String {
    if id.ends_with(".png") {
        id.to_string()
    } else {
        format!("{id}.png")
    }
}

/// Delete `bucket/key` after `delay` in a detached task
///
/// The outcome is only logged. The handle is returned for tests; dropping it
/// does not cancel the deletion.
pub fn schedule_deletion(
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    delay: Duration,
) -> JoinHandle<()> {
    tracing::debug!(bucket = %bucket, key = %key, delay_secs = delay.as_secs(), "scheduled image deletion");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match store.delete_object(&bucket, &key).await {
            Ok(()) => tracing::info!(bucket = %bucket, key = %key, "deleted expired image"),
            Err(e) => tracing::warn!(
                bucket = %bucket,
                key = %key,
                error = %e,
                "scheduled image deletion failed"
            ),
        }
    })
}

/// Generates images, hosts them temporarily and records them in history
#[derive(Clone)]
pub struct ImagePipeline {
    generator: Option<Arc<dyn ImageGenerator>>,
    store: Arc<dyn ObjectStore>,
    memory: ConversationStore,
    bucket: String,
    public_base_url: Option<String>,
    delete_delay: Duration,
}

impl ImagePipeline {
    /// Create a pipeline; without a generator `generate_image` fails with `Error::Config`
    #[must_use]
    pub fn new(
        generator: Option<Arc<dyn ImageGenerator>>,
        store: Arc<dyn ObjectStore>,
        memory: ConversationStore,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            store,
            memory,
            bucket: bucket.into(),
            public_base_url: None,
            delete_delay: DEFAULT_DELETE_DELAY,
        }
    }

    /// Link images as `{base}/{object}` instead of presigned URLs
    #[must_use]
    pub fn public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.map(|b| b.trim_end_matches('/').to_string());
        self
    }

    /// Set how long generated images are kept
    #[must_use]
    pub const fn delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    /// Whether an image generator is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Generate an image, store it, record it and schedule its deletion
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` without a generator, `Error::Generation` if
    /// the image service fails, or a storage error if the upload fails
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        self.generate_image_with_handle(prompt)
            .await
            .map(|(image, _)| image)
    }

    /// Like [`generate_image`](Self::generate_image), also returning the
    /// deletion task handle
    ///
    /// # Errors
    ///
    /// Same as [`generate_image`](Self::generate_image)
    pub async fn generate_image_with_handle(
        &self,
        prompt: &str,
    ) -> Result<(GeneratedImage, JoinHandle<()>)> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::Config("IMAGE_API_KEY must be set".to_string()))?;

        let bytes = generator.generate(prompt).await?;

        let id = Uuid::new_v4().simple().to_string();
        let key = object_name(&id);
        self.store
            .put_object(&self.bucket, &key, bytes, "image/png")
            .await?;
        tracing::info!(provider = generator.name(), key = %key, "stored generated image");

        let deletion = schedule_deletion(
            self.store.clone(),
            self.bucket.clone(),
            key.clone(),
            self.delete_delay,
        );

        let image_url = match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => self
                .store
                .presigned_get_url(&self.bucket, &key, PRESIGNED_URL_EXPIRY)
                .await?,
        };

        let mut history = self.memory.load().await;
        history.push(Message::image(image_url.clone(), unix_now()));
        self.memory.save(&history).await;

        Ok((GeneratedImage { image_url, id }, deletion))
    }

    /// Presigned link for one stored image
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the image no longer exists
    pub async fn image_url(&self, id: &str) -> Result<String> {
        let key = object_name(id);
        self.store.stat_object(&self.bucket, &key).await?;
        self.store
            .presigned_get_url(&self.bucket, &key, PRESIGNED_URL_EXPIRY)
            .await
    }

    /// Presigned links for every stored image
    ///
    /// # Errors
    ///
    /// Returns error if the bucket cannot be listed or a link cannot be signed
    pub async fn list_image_urls(&self) -> Result<Vec<ImageLink>> {
        let objects = self.store.list_objects(&self.bucket).await?;
        let mut links = Vec::with_capacity(objects.len());
        for object in objects {
            let url = self
                .store
                .presigned_get_url(&self.bucket, &object.key, PRESIGNED_URL_EXPIRY)
                .await?;
            let id = object
                .key
                .strip_suffix(".png")
                .unwrap_or(&object.key)
                .to_string();
            links.push(ImageLink { id, url });
        }
        Ok(links)
    }
}

#[allow(clippy::cast_precision_loss)]
fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
