//! OpenRouter (OpenAI-compatible) chat completions client

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel};
use crate::{Error, Result};

/// Default OpenRouter API base
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Chat completions over an OpenAI-compatible HTTP API
pub struct OpenRouterClient {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    /// Create a new client
    #[must_use]
    pub fn new(api_key: SecretString, model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage], temperature: f64) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("LLM API error: {status} - {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("failed to parse LLM response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::Generation("LLM returned no content".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
    use tokio::net::TcpListener;

    use super::*;

    type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn serve(reply: serde_json::Value, status: u16) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                        let reply = reply.clone();
                        async move {
                            let auth = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(ToString::to_string);
                            seen.lock().unwrap().push((auth, body));
                            (
                                axum::http::StatusCode::from_u16(status).unwrap(),
                                Json(reply),
                            )
                        }
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), seen)
    }

    fn client(base_url: String) -> OpenRouterClient {
        OpenRouterClient::new(
            SecretString::from("sk-test"),
            "test/model".to_string(),
            base_url,
        )
    }

    #[tokio::test]
    async fn test_complete_sends_model_messages_and_temperature() {
        let (base, seen) = serve(
            serde_json::json!({"choices": [{"message": {"content": "  hello world  "}}]}),
            200,
        )
        .await;

        let reply = client(base)
            .complete(&[ChatMessage::user("hi")], 0.9)
            .await
            .unwrap();
        assert_eq!(reply, "  hello world  ");

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "test/model");
        assert_eq!(body["temperature"], 0.9);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn test_error_status_is_generation_failure() {
        let (base, _) = serve(serde_json::json!({"error": "bad key"}), 401).await;
        let err = client(base)
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_empty_content_is_generation_failure() {
        let (base, _) = serve(serde_json::json!({"choices": []}), 200).await;
        let err = client(base)
            .complete(&[ChatMessage::user("hi")], 0.7)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
