//! Error types for the tweetgen gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credential, model, endpoint)
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-success response from a remote dependency
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Remote call completed but produced nothing usable
    #[error("generation failed: {0}")]
    Generation(String),

    /// Object store operation failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Object or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
