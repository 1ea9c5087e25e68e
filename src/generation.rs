//! Post text generation with conversational memory

use std::sync::Arc;

use serde::Deserialize;

use crate::history::{ConversationStore, Message, Role};
use crate::llm::{ChatMessage, ChatModel};
use crate::{Error, Result};

const SYSTEM_PROMPT: &str =
    "You are a social media copywriter. You write short posts and remember earlier drafts in this conversation.";

const HASHTAGS_ON: &str = " Include relevant hashtags.";
const HASHTAGS_OFF: &str = " Do not include any hashtags.";
const EMOJIS_ON: &str = " Include relevant emojis.";
const EMOJIS_OFF: &str = " Do not include any emojis.";
const CLOSING: &str = " Keep it concise and engaging. Only generate the tweet itself without any additional text or explanation.";

/// Named temperature presets accepted by `/generate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Creativity {
    Precise,
    #[default]
    Balanced,
    Creative,
    Wild,
}

impl Creativity {
    /// Parse a preset name; unknown names fall back to `Balanced`
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "precise" => Self::Precise,
            "creative" => Self::Creative,
            "wild" => Self::Wild,
            _ => Self::Balanced,
        }
    }

    /// Sampling temperature for this preset
    #[must_use]
    pub const fn temperature(self) -> f64 {
        match self {
            Self::Precise => 0.2,
            Self::Balanced => 0.7,
            Self::Creative => 0.9,
            Self::Wild => 1.2,
        }
    }
}

impl<'de> Deserialize<'de> for Creativity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Options for one generation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub hashtag: bool,
    #[serde(default)]
    pub emoji: bool,
    #[serde(default)]
    pub temperature: Creativity,
}

/// Build the instruction sent as the new user turn
#[must_use]
pub fn build_instruction(prompt: &str, hashtag: bool, emoji: bool) -> String {
    let mut instruction = format!("Write a tweet about: {}.", prompt.trim());
    instruction.push_str(if hashtag { HASHTAGS_ON } else { HASHTAGS_OFF });
    instruction.push_str(if emoji { EMOJIS_ON } else { EMOJIS_OFF });
    instruction.push_str(CLOSING);
    instruction
}

/// Generates posts using the shared conversation as model context
#[derive(Clone)]
pub struct Generator {
    model: Option<Arc<dyn ChatModel>>,
    memory: ConversationStore,
}

impl Generator {
    /// Create a generator; without a model every call fails with `Error::Config`
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>, memory: ConversationStore) -> Self {
        Self { model, memory }
    }

    /// Whether a language model is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Generate a post, append it to the conversation and persist it
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no model is configured, or
    /// `Error::Generation` if the model call fails
    pub async fn generate_text(&self, request: &GenerateRequest) -> Result<String> {
        let mut history = self.memory.load().await;

        let model = self.model.as_ref().ok_or_else(|| {
            Error::Config("OPENROUTER_API_KEY and OPENROUTER_MODEL must be set".to_string())
        })?;

        let instruction = build_instruction(&request.prompt, request.hashtag, request.emoji);
        let temperature = request.temperature.temperature();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(
            history
                .messages()
                .iter()
                .filter(|m| !m.content.trim().is_empty())
                .map(|m| match m.role {
                    Role::Human => ChatMessage::user(m.content.clone()),
                    Role::Ai => ChatMessage::assistant(m.content.clone()),
                }),
        );
        messages.push(ChatMessage::user(instruction));

        tracing::debug!(
            model = model.model_id(),
            temperature,
            context_messages = messages.len(),
            "requesting post generation"
        );

        let reply = model.complete(&messages, temperature).await?;
        let text = reply.trim().to_string();
        if text.is_empty() {
            return Err(Error::Generation("model returned an empty post".to_string()));
        }

        history.push(Message::ai(text.clone()));
        self.memory.save(&history).await;

        tracing::info!(chars = text.len(), "generated post");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::InMemoryStore;

    #[derive(Default)]
    struct RecordingModel {
        calls: Mutex<Vec<(Vec<ChatMessage>, f64)>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, messages: &[ChatMessage], temperature: f64) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), temperature));
            Ok("  Fresh coffee, fresh start. #coffee \n".to_string())
        }

        fn model_id(&self) -> &str {
            "recording"
        }
    }

    fn memory() -> ConversationStore {
        ConversationStore::new(Arc::new(InMemoryStore::new()), "chat-memory")
    }

    #[test]
    fn test_temperature_presets() {
        assert!((Creativity::from_label("precise").temperature() - 0.2).abs() < f64::EPSILON);
        assert!((Creativity::from_label("balanced").temperature() - 0.7).abs() < f64::EPSILON);
        assert!((Creativity::from_label("creative").temperature() - 0.9).abs() < f64::EPSILON);
        assert!((Creativity::from_label("wild").temperature() - 1.2).abs() < f64::EPSILON);
        assert_eq!(Creativity::from_label("spicy"), Creativity::Balanced);
        assert_eq!(Creativity::from_label(""), Creativity::Balanced);
        assert_eq!(Creativity::from_label("Wild"), Creativity::Balanced);
    }

    #[test]
    fn test_request_defaults() {
        let request: GenerateRequest = serde_json::from_str(r#"{"prompt": "tea"}"#).unwrap();
        assert!(!request.hashtag);
        assert!(!request.emoji);
        assert_eq!(request.temperature, Creativity::Balanced);

        let request: GenerateRequest =
            serde_json::from_str(r#"{"prompt": "tea", "temperature": "unheard-of"}"#).unwrap();
        assert_eq!(request.temperature, Creativity::Balanced);
    }

    #[test]
    fn test_instruction_clauses_for_every_combination() {
        for hashtag in [false, true] {
            for emoji in [false, true] {
                let text = build_instruction("  coffee ", hashtag, emoji);
                assert!(text.starts_with("Write a tweet about: coffee."));
                assert_eq!(text.matches(HASHTAGS_ON).count(), usize::from(hashtag));
                assert_eq!(text.matches(HASHTAGS_OFF).count(), usize::from(!hashtag));
                assert_eq!(text.matches(EMOJIS_ON).count(), usize::from(emoji));
                assert_eq!(text.matches(EMOJIS_OFF).count(), usize::from(!emoji));
                assert!(text.ends_with(CLOSING));
            }
        }
    }

    #[tokio::test]
    async fn test_generate_appends_reply_and_uses_history() {
        let model = Arc::new(RecordingModel::default());
        let memory = memory();
        let mut seeded = crate::history::ConversationHistory::new();
        seeded.push(Message::ai("an earlier post"));
        seeded.push(Message::image("http://img/1.png", 1.0));
        memory.save(&seeded).await;

        let generator = Generator::new(Some(model.clone()), memory.clone());
        let request = GenerateRequest {
            prompt: "coffee".to_string(),
            hashtag: true,
            emoji: false,
            temperature: Creativity::Creative,
        };

        let text = generator.generate_text(&request).await.unwrap();
        assert_eq!(text, "Fresh coffee, fresh start. #coffee");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, temperature) = &calls[0];
        assert!((temperature - 0.9).abs() < f64::EPSILON);
        // system, earlier post (image turn has no text), new instruction
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::assistant("an earlier post"));
        let last = &messages[2].content;
        assert!(last.contains(HASHTAGS_ON) && last.contains(EMOJIS_OFF));

        let history = memory.load().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[2], Message::ai(text));
    }

    #[tokio::test]
    async fn test_missing_model_is_config_error() {
        let memory = memory();
        let generator = Generator::new(None, memory.clone());
        let err = generator
            .generate_text(&GenerateRequest {
                prompt: "x".to_string(),
                ..GenerateRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(memory.load().await.is_empty());
    }
}
