//! Tweetgen Gateway - HTTP backend for generating and posting tweets
//!
//! This library provides the core functionality for the tweetgen gateway:
//! - Post generation through an OpenRouter chat model with shared memory
//! - Image generation with temporary object storage hosting
//! - Forwarding finished posts to a social service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    HTTP clients                      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Tweetgen Gateway                     │
//! │  Generator  │  Image pipeline  │  Posting proxy      │
//! └──────┬─────────────┬──────────────────┬─────────────┘
//!        │             │                  │
//! ┌──────▼──────┐ ┌────▼──────────┐ ┌─────▼─────────────┐
//! │ OpenRouter  │ │ Image service │ │ Social service    │
//! └─────────────┘ └───────────────┘ └───────────────────┘
//!        object storage: images + chat_memory.json
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod images;
pub mod llm;
pub mod social;
pub mod storage;

pub use api::{ApiServer, ApiServerBuilder};
pub use config::Config;
pub use error::{Error, Result};
pub use generation::{Creativity, GenerateRequest, Generator};
pub use history::{ConversationHistory, ConversationStore, Message, Role};
pub use images::{ImageGenerator, ImagePipeline};
pub use llm::ChatModel;
pub use social::{Post, PostPublisher, PostingProxy};
pub use storage::{InMemoryStore, ObjectStore, S3Store};
