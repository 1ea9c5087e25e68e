//! Configuration management for the tweetgen gateway
//!
//! Every option resolves as environment variable > TOML file > default.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};
use file::ConfigFile;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub social: SocialConfig,
    pub server: ServerConfig,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `OpenRouter` API key (`OPENROUTER_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Model identifier (`OPENROUTER_MODEL`)
    pub model: Option<String>,

    /// OpenAI-compatible API base (`OPENROUTER_BASE_URL`)
    pub base_url: String,
}

/// Image generation configuration
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Image service credential (`IMAGE_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Image service base URL (`IMAGE_API_URL`)
    pub base_url: String,

    pub width: u32,
    pub height: u32,

    /// How long generated images are kept (`IMAGE_DELETE_DELAY_SECONDS`)
    pub delete_delay: Duration,
}

/// Which object store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3-compatible server (MinIO, AWS)
    S3,
    /// Process-local store, contents lost on restart
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "s3" | "minio" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("unknown storage backend: {other}"))),
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// `host:port` or URL (`MINIO_ENDPOINT`)
    pub endpoint: String,

    pub access_key: SecretString,
    pub secret_key: SecretString,

    /// Use TLS when the endpoint has no scheme (`MINIO_SECURE`)
    pub secure: bool,

    pub region: String,

    /// Bucket for generated images (`MINIO_BUCKET`)
    pub image_bucket: String,

    /// Bucket for the conversation document (`MINIO_CHAT_BUCKET`)
    pub chat_bucket: String,

    /// Public base URL for image links (`MINIO_PUBLIC_URL`)
    pub public_url: Option<String>,
}

/// Social service configuration
#[derive(Debug, Clone, Default)]
pub struct SocialConfig {
    /// Endpoint posts are forwarded to (`TWEET_API_URL`)
    pub endpoint: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (`PORT`)
    pub port: u16,

    /// Allowed CORS origins (`ALLOWED_ORIGINS`, comma-separated); `*` allows any
    pub allowed_origins: Vec<String>,
}

/// Treat empty values as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn resolve(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| non_empty(env(key));

        let llm = LlmConfig {
            api_key: var("OPENROUTER_API_KEY")
                .or(non_empty(fc.llm.api_key))
                .map(SecretString::from),
            model: var("OPENROUTER_MODEL").or(non_empty(fc.llm.model)),
            base_url: var("OPENROUTER_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string()),
        };

        let delete_delay_secs = match var("IMAGE_DELETE_DELAY_SECONDS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("invalid IMAGE_DELETE_DELAY_SECONDS {raw:?}: {e}"))
            })?,
            None => fc
                .image
                .delete_delay_secs
                .unwrap_or(crate::images::DEFAULT_DELETE_DELAY.as_secs()),
        };

        let image = ImageConfig {
            api_key: var("IMAGE_API_KEY")
                .or(non_empty(fc.image.api_key))
                .map(SecretString::from),
            base_url: var("IMAGE_API_URL")
                .or(fc.image.base_url)
                .unwrap_or_else(|| crate::images::DEFAULT_BASE_URL.to_string()),
            width: fc.image.width.unwrap_or(1024),
            height: fc.image.height.unwrap_or(1024),
            delete_delay: Duration::from_secs(delete_delay_secs),
        };

        let backend = match var("STORAGE_BACKEND").or(fc.storage.backend) {
            Some(raw) => StorageBackend::parse(&raw)?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            endpoint: var("MINIO_ENDPOINT")
                .or(fc.storage.endpoint)
                .unwrap_or_else(|| "localhost:9000".to_string()),
            access_key: SecretString::from(
                var("MINIO_ACCESS_KEY")
                    .or(fc.storage.access_key)
                    .unwrap_or_default(),
            ),
            secret_key: SecretString::from(
                var("MINIO_SECRET_KEY")
                    .or(fc.storage.secret_key)
                    .unwrap_or_default(),
            ),
            secure: var("MINIO_SECURE")
                .map(|v| parse_bool(&v))
                .or(fc.storage.secure)
                .unwrap_or(false),
            region: var("MINIO_REGION")
                .or(fc.storage.region)
                .unwrap_or_else(|| "us-east-1".to_string()),
            image_bucket: var("MINIO_BUCKET")
                .or(fc.storage.image_bucket)
                .unwrap_or_else(|| "tweet-images".to_string()),
            chat_bucket: var("MINIO_CHAT_BUCKET")
                .or(fc.storage.chat_bucket)
                .unwrap_or_else(|| "chat-memory".to_string()),
            public_url: var("MINIO_PUBLIC_URL").or(non_empty(fc.storage.public_url)),
        };

        let social = SocialConfig {
            endpoint: var("TWEET_API_URL").or(non_empty(fc.social.endpoint)),
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid PORT {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(8000),
        };

        let server = ServerConfig {
            port,
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .or(fc.server.allowed_origins)
                .filter(|origins| !origins.is_empty())
                .unwrap_or_else(|| vec!["*".to_string()]),
        };

        Ok(Self {
            llm,
            image,
            storage,
            social,
            server,
        })
    }
}
