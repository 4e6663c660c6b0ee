//! Configuration management for hn-catchup.
//!
//! Configuration is read from `~/.config/hn-catchup/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fetcher::DEFAULT_MAX_DEPTH;
use crate::llm::LlmConfig;

pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub digest: DigestConfig,
    pub comments: CommentsConfig,
    pub feed: FeedConfig,
    pub llm: LlmConfig,
}

/// Remote item API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hacker-news.firebaseio.com/v0".to_string(),
            timeout_secs: 15,
            user_agent: concat!("hn-catchup/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Digest cadence and prompt size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// A cached digest younger than this is returned as is (default: 300)
    pub freshness_window_secs: u64,
    /// Visits closer together than this are "all caught up" (default: 1800)
    pub min_interval_secs: u64,
    /// Stories fetched for one digest (default: 50)
    pub story_limit: usize,
    /// Stories listed in the prompt (default: 30)
    pub prompt_story_limit: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: 300,
            min_interval_secs: 1800,
            story_limit: 50,
            prompt_story_limit: 30,
        }
    }
}

impl DigestConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub max_depth: usize,
    pub page_size: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            page_size: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 30 }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default().with_env_overrides());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config.with_env_overrides())
    }

    /// Get the default config file path: `~/.config/hn-catchup/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("hn-catchup").join("config.toml"))
    }

    /// Fill an empty API key from the environment.
    fn with_env_overrides(mut self) -> Self {
        if self.llm.anthropic_api_key.trim().is_empty() {
            if let Some(key) = env_non_empty(ANTHROPIC_API_KEY_ENV) {
                self.llm.anthropic_api_key = key;
            }
        }
        self
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# hn-catchup configuration

[api]
base_url = "https://hacker-news.firebaseio.com/v0"
# Per-request timeout in seconds
timeout_secs = 15

[digest]
# A digest generated less than this many seconds ago is reused
freshness_window_secs = 300
# Visits closer together than this are reported as "all caught up"
min_interval_secs = 1800
# Stories fetched for one digest
story_limit = 50
# Stories listed in the prompt
prompt_story_limit = 30

[comments]
# Replies deeper than this are not fetched
max_depth = 3
page_size = 15

[feed]
page_size = 30

[llm]
# One of: "on_device", "local", "anthropic"
provider = "on_device"
# Falls back to the ANTHROPIC_API_KEY environment variable when empty
anthropic_api_key = ""
anthropic_model = "claude-sonnet-4-5-20250929"
# Model downloaded by the "local" provider (see `hn-catchup providers`)
local_model_id = "Qwen/Qwen3-0.6B-GGUF"

[llm.on_device]
# Ollama-compatible daemon on this machine
host = "http://127.0.0.1:11434"
model = "llama3.2"
timeout_secs = 120

[llm.local]
# OpenAI-compatible runtime serving downloaded models
endpoint = "http://127.0.0.1:8080"
timeout_secs = 300
# models_dir = "/path/to/models"
"##
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config.digest.freshness_window_secs, 300);
        assert_eq!(config.digest.min_interval_secs, 1800);
        assert_eq!(config.comments.max_depth, 3);
        assert_eq!(config.llm.provider, Provider::OnDevice);
        assert_eq!(config.llm.on_device.model, "llama3.2");
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[digest]
min_interval_secs = 60

[llm]
provider = "anthropic"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.digest.min_interval(), Duration::from_secs(60));
        assert_eq!(config.digest.freshness_window(), Duration::from_secs(300));
        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.llm.anthropic_model, "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.api.base_url, "https://hacker-news.firebaseio.com/v0");
        assert_eq!(config.digest.story_limit, 50);
        assert_eq!(config.feed.page_size, 30);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result = toml::from_str::<Config>("[llm]\nprovider = \"gpt\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[comments]\nmax_depth = 1\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.comments.max_depth, 1);
        assert_eq!(config.comments.page_size, 15);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[digest\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
