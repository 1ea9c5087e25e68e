//! Pollinations-style text-to-image client
//!
//! `GET {base}/prompt/{prompt}?seed=..&width=..&height=..&nologo=true`
//! returns the image bytes directly.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::ImageGenerator;
use crate::{Error, Result};

/// Default image API base
pub const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai";

/// Image generation over a prompt-in-path HTTP API
pub struct PollinationsClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    width: u32,
    height: u32,
}

impl PollinationsClient {
    /// Create a new client
    #[must_use]
    pub fn new(api_key: SecretString, base_url: String, width: u32, height: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            width,
            height,
        }
    }

    fn request_url(&self, prompt: &str, seed: u32) -> String {
        format!(
            "{}/prompt/{}?seed={seed}&width={}&height={}&nologo=true",
            self.base_url,
            urlencoding::encode(prompt),
            self.width,
            self.height,
        )
    }
}

#[async_trait]
impl ImageGenerator for PollinationsClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let seed: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let url = self.request_url(prompt, seed);
        tracing::debug!(seed, "requesting image");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| Error::Generation(format!("image request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "image API error: {status} - {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Generation(format!("failed to read image: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::Generation("image API returned no data".to_string()));
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "pollinations"
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, extract::Path, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> PollinationsClient {
        PollinationsClient::new(SecretString::from("img-key"), base_url, 512, 512)
    }

    #[test]
    fn test_prompt_is_url_encoded() {
        let c = client("https://img.example/".to_string());
        let url = c.request_url("a cat & a dog?", 42);
        assert_eq!(
            url,
            "https://img.example/prompt/a%20cat%20%26%20a%20dog%3F?seed=42&width=512&height=512&nologo=true"
        );
    }

    #[tokio::test]
    async fn test_returns_image_bytes() {
        let app = Router::new().route(
            "/prompt/{prompt}",
            get(|Path(prompt): Path<String>| async move {
                assert_eq!(prompt, "sunny beach");
                vec![0x89_u8, b'P', b'N', b'G']
            }),
        );
        let base = serve(app).await;

        let bytes = client(base).generate("sunny beach").await.unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_error_status_carries_upstream_detail() {
        let app = Router::new().route(
            "/prompt/{prompt}",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;

        let err = client(base).generate("x").await.unwrap_err();
        assert!(
            matches!(err, Error::Generation(msg) if msg.contains("429") && msg.contains("slow down"))
        );
    }
}
