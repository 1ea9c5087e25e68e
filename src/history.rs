//! Conversation history and its persistence
//!
//! The whole gateway shares a single conversation, stored as one JSON
//! document in the chat bucket. Reads and writes are unsynchronized
//! load-mutate-save cycles, so concurrent requests can lose each other's
//! updates (last write wins).
//!
//! The document uses LangChain's `messages_to_dict` layout so histories
//! written by earlier deployments still load:
//!
//! ```json
//! [{"type": "ai", "data": {"content": "", "additional_kwargs": {"image_url": "...", "timestamp": 1.7e9, "type": "image"}}}]
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::ObjectStore;
use crate::{Error, Result};

/// Object name of the persisted conversation
pub const MEMORY_OBJECT_NAME: &str = "chat_memory.json";

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Retrieval URL, set only for image turns
    pub image_url: Option<String>,
    /// Seconds since the Unix epoch
    pub timestamp: Option<f64>,
    /// Display type overriding the role, e.g. `"image"`
    pub kind: Option<String>,
}

impl Message {
    /// A user turn
    #[must_use]
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            image_url: None,
            timestamp: None,
            kind: None,
        }
    }

    /// A model reply
    #[must_use]
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            ..Self::human(content)
        }
    }

    /// An image-only turn referencing a stored image
    #[must_use]
    pub fn image(image_url: impl Into<String>, timestamp: f64) -> Self {
        Self {
            role: Role::Ai,
            content: String::new(),
            image_url: Some(image_url.into()),
            timestamp: Some(timestamp),
            kind: Some("image".to_string()),
        }
    }

    /// Type shown to clients: the explicit kind if set, else the role
    #[must_use]
    pub fn display_type(&self) -> &str {
        self.kind.as_deref().unwrap_or(self.role.as_str())
    }
}

/// Ordered log of messages, oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Serialize to the persisted JSON document
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let stored: Vec<StoredMessage> = self.messages.iter().map(StoredMessage::from).collect();
        Ok(serde_json::to_vec(&stored)?)
    }

    /// Parse a persisted JSON document
    ///
    /// Entries with a message type other than `human` or `ai` (e.g. `system`,
    /// `tool`) are skipped; the rest of the conversation still loads.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not a JSON array
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_slice(data)?;
        let messages = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<StoredMessage>(entry) {
                Ok(stored) => Some(Message::from(stored)),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unsupported history entry");
                    None
                }
            })
            .collect();
        Ok(Self { messages })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    #[serde(rename = "type")]
    role: Role,
    data: StoredData,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredData {
    #[serde(default)]
    content: String,
    #[serde(default)]
    additional_kwargs: StoredExtras,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl From<&Message> for StoredMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            data: StoredData {
                content: message.content.clone(),
                additional_kwargs: StoredExtras {
                    image_url: message.image_url.clone(),
                    timestamp: message.timestamp,
                    kind: message.kind.clone(),
                },
            },
        }
    }
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        let extras = stored.data.additional_kwargs;
        Self {
            role: stored.role,
            content: stored.data.content,
            image_url: extras.image_url,
            timestamp: extras.timestamp,
            kind: extras.kind,
        }
    }
}

/// Loads and saves the shared conversation in the chat bucket
///
/// Failures never reach callers of [`load`](Self::load), [`save`](Self::save)
/// or [`clear`](Self::clear): the chat keeps working without durable history.
#[derive(Clone)]
pub struct ConversationStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ConversationStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Fetch and parse the persisted conversation
    ///
    /// # Errors
    ///
    /// Returns error if the document is missing, unreadable or malformed
    pub async fn try_load(&self) -> Result<ConversationHistory> {
        let data = self
            .store
            .get_object(&self.bucket, MEMORY_OBJECT_NAME)
            .await?;
        ConversationHistory::from_json(&data)
    }

    /// Load the conversation, starting fresh on any failure
    pub async fn load(&self) -> ConversationHistory {
        match self.try_load().await {
            Ok(history) => {
                tracing::debug!(messages = history.len(), "loaded conversation history");
                history
            }
            Err(Error::NotFound(_)) => {
                tracing::debug!("no conversation history yet, starting fresh");
                ConversationHistory::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load conversation history, starting fresh");
                ConversationHistory::new()
            }
        }
    }

    /// Overwrite the persisted conversation
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the upload fails
    pub async fn try_save(&self, history: &ConversationHistory) -> Result<()> {
        let data = history.to_json()?;
        self.store
            .put_object(&self.bucket, MEMORY_OBJECT_NAME, data, "application/json")
            .await
    }

    /// Persist the conversation, logging and dropping any failure
    pub async fn save(&self, history: &ConversationHistory) {
        match self.try_save(history).await {
            Ok(()) => tracing::debug!(
                bucket = %self.bucket,
                messages = history.len(),
                "saved conversation history"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to save conversation history"),
        }
    }

    /// Replace the persisted conversation with an empty one
    pub async fn clear(&self) {
        self.save(&ConversationHistory::new()).await;
        tracing::info!("conversation history cleared");
    }
}
