//! TOML configuration file loading
//!
//! Supports `~/.config/tweetgen/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub llm: LlmFileConfig,

    #[serde(default)]
    pub image: ImageFileConfig,

    #[serde(default)]
    pub storage: StorageFileConfig,

    #[serde(default)]
    pub social: SocialFileConfig,

    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Language model settings
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub api_key: Option<String>,
    /// Model identifier (e.g. "openai/gpt-4o-mini")
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Image generation settings
#[derive(Debug, Default, Deserialize)]
pub struct ImageFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Seconds before a generated image is deleted
    pub delete_delay_secs: Option<u64>,
}

/// Object storage settings
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// "s3" or "memory"
    pub backend: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub secure: Option<bool>,
    pub region: Option<String>,
    pub image_bucket: Option<String>,
    pub chat_bucket: Option<String>,
    /// Base URL images are publicly reachable under
    pub public_url: Option<String>,
}

/// Social posting settings
#[derive(Debug, Default, Deserialize)]
pub struct SocialFileConfig {
    pub endpoint: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/tweetgen/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("tweetgen").join("config.toml"))
}
