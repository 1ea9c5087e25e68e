//! Posting finished posts to the remote social service

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::storage::ObjectStore;
use crate::{Error, Result};

/// Status returned to clients after a successful post
pub const POSTED_STATUS: &str = "Tweet posted";

/// A post ready to publish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub username: String,
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// The remote social service
#[async_trait]
pub trait PostPublisher: Send + Sync {
    /// Publish a post on behalf of the caller's API key
    ///
    /// # Errors
    ///
    /// Returns `Error::Upstream` if the service rejects the post
    async fn publish(&self, post: &Post, api_key: &str) -> Result<()>;
}

/// Publishes posts as JSON to a fixed HTTP endpoint
pub struct HttpPublisher {
    client: Client,
    endpoint: String,
}

impl HttpPublisher {
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl PostPublisher for HttpPublisher {
    async fn publish(&self, post: &Post, api_key: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", api_key)
            .json(post)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("posting failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "social service rejected post");
            return Err(Error::Upstream(body));
        }

        Ok(())
    }
}

/// Stored object name referenced by an image URL
///
/// Takes the last path segment with any query string or fragment removed.
#[must_use]
pub fn object_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Forwards posts and reclaims the images they used
#[derive(Clone)]
pub struct PostingProxy {
    publisher: Option<Arc<dyn PostPublisher>>,
    store: Arc<dyn ObjectStore>,
    image_bucket: String,
}

impl PostingProxy {
    /// Create a proxy; without a publisher every post fails with `Error::Config`
    #[must_use]
    pub fn new(
        publisher: Option<Arc<dyn PostPublisher>>,
        store: Arc<dyn ObjectStore>,
        image_bucket: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            store,
            image_bucket: image_bucket.into(),
        }
    }

    /// Whether a posting endpoint is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.publisher.is_some()
    }

    /// Publish `post`, then delete its image from storage
    ///
    /// Image deletion may race the scheduled deletion; its failures are logged.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` without a publisher, or `Error::Upstream`
    /// if the social service rejects the post
    pub async fn post_tweet(&self, post: &Post, api_key: &str) -> Result<&'static str> {
        let publisher = self
            .publisher
            .as_ref()
            .ok_or_else(|| Error::Config("TWEET_API_URL must be set".to_string()))?;

        publisher.publish(post, api_key).await?;
        tracing::info!(username = %post.username, has_image = post.image.is_some(), "post published");

        if let Some(key) = post.image.as_deref().and_then(object_name_from_url) {
            match self.store.delete_object(&self.image_bucket, key).await {
                Ok(()) => tracing::info!(key, "deleted posted image"),
                Err(e) => tracing::warn!(key, error = %e, "failed to delete posted image"),
            }
        }

        Ok(POSTED_STATUS)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::storage::InMemoryStore;

    #[derive(Default)]
    struct RecordingPublisher {
        reject: bool,
        posts: Mutex<Vec<(Post, String)>>,
    }

    #[async_trait]
    impl PostPublisher for RecordingPublisher {
        async fn publish(&self, post: &Post, api_key: &str) -> Result<()> {
            if self.reject {
                return Err(Error::Upstream("invalid api key".to_string()));
            }
            self.posts
                .lock()
                .unwrap()
                .push((post.clone(), api_key.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_object_name_from_url() {
        assert_eq!(
            object_name_from_url("http://localhost:9000/tweet-images/abc.png?X-Amz-Signature=1"),
            Some("abc.png")
        );
        assert_eq!(
            object_name_from_url("https://cdn.example.com/abc.png"),
            Some("abc.png")
        );
        assert_eq!(object_name_from_url("abc.png#frag"), Some("abc.png"));
        assert_eq!(object_name_from_url("https://cdn.example.com/"), None);
    }

    #[tokio::test]
    async fn test_successful_post_deletes_image() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put_object("tweet-images", "abc.png", vec![1], "image/png")
            .await
            .unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let proxy = PostingProxy::new(Some(publisher.clone()), store.clone(), "tweet-images");

        let post = Post {
            username: "alice".to_string(),
            text: "hello".to_string(),
            image: Some("http://localhost:9000/tweet-images/abc.png?sig=x".to_string()),
        };
        let status = proxy.post_tweet(&post, "key-1").await.unwrap();

        assert_eq!(status, POSTED_STATUS);
        assert!(!store.contains("tweet-images", "abc.png").await);
        let posts = publisher.posts.lock().unwrap();
        assert_eq!(posts[0].1, "key-1");
    }

    #[tokio::test]
    async fn test_rejected_post_keeps_image() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put_object("tweet-images", "abc.png", vec![1], "image/png")
            .await
            .unwrap();
        let publisher = Arc::new(RecordingPublisher {
            reject: true,
            ..RecordingPublisher::default()
        });
        let proxy = PostingProxy::new(Some(publisher), store.clone(), "tweet-images");

        let post = Post {
            username: "alice".to_string(),
            text: "hello".to_string(),
            image: Some("http://x/tweet-images/abc.png".to_string()),
        };
        let err = proxy.post_tweet(&post, "bad").await.unwrap_err();

        assert!(matches!(err, Error::Upstream(body) if body == "invalid api key"));
        assert!(store.contains("tweet-images", "abc.png").await);
    }

    #[tokio::test]
    async fn test_post_with_already_deleted_image_succeeds() {
        let store = Arc::new(InMemoryStore::new());
        let proxy = PostingProxy::new(
            Some(Arc::new(RecordingPublisher::default())),
            store,
            "tweet-images",
        );
        let post = Post {
            username: "bob".to_string(),
            text: "hi".to_string(),
            image: Some("http://x/tweet-images/gone.png".to_string()),
        };
        assert_eq!(proxy.post_tweet(&post, "k").await.unwrap(), POSTED_STATUS);
    }

    #[tokio::test]
    async fn test_missing_publisher_is_config_error() {
        let proxy = PostingProxy::new(None, Arc::new(InMemoryStore::new()), "tweet-images");
        let post = Post {
            username: "bob".to_string(),
            text: "hi".to_string(),
            image: None,
        };
        assert!(matches!(
            proxy.post_tweet(&post, "k").await,
            Err(Error::Config(_))
        ));
    }
}
