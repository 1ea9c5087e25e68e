//! Language model access
//!
//! The gateway only needs single-shot chat completions. [`ChatModel`] is the
//! seam; [`OpenRouterClient`] talks to any OpenAI-compatible endpoint.

mod openrouter;

pub use openrouter::{DEFAULT_BASE_URL, OpenRouterClient};

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

/// Chat completion role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A remote chat model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the reply text
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` if the call fails or the reply is empty
    async fn complete(&self, messages: &[ChatMessage], temperature: f64) -> Result<String>;

    /// Model identifier for logging
    fn model_id(&self) -> &str;
}
