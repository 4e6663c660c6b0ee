//! Text generation backends.
//!
//! Every backend turns a prompt into text through [`GenerationBackend`]. The
//! local backend also downloads model files before first use and publishes
//! the download through [`DownloadProgressSource`]. Which backend runs is
//! decided per call from an [`LlmConfig`] by the [`GenerationService`].

pub mod anthropic;
pub mod filter;
pub mod local;
pub mod on_device;
pub mod progress;
pub mod service;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use anthropic::AnthropicBackend;
pub use local::{LocalModelBackend, ModelOption, MODEL_CATALOG};
pub use on_device::OnDeviceBackend;
pub use progress::ProgressReporter;
pub use service::GenerationService;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Anthropic API key is not configured. Set anthropic_api_key in the config file or ANTHROPIC_API_KEY.")]
    ApiKeyMissing,

    #[error("{0}")]
    Unavailable(String),

    #[error("Failed to download model {model_id}: {message}")]
    Download { model_id: String, message: String },

    #[error("{provider} returned status {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    OnDevice,
    Local,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OnDevice, Provider::Local, Provider::Anthropic];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OnDevice => "on_device",
            Provider::Local => "local",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OnDevice => "On-Device",
            Provider::Local => "Local Model",
            Provider::Anthropic => "Claude (Anthropic)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Provider::OnDevice => "Uses the model daemon already running on this machine. Free, private.",
            Provider::Local => "Downloads a model once and runs it locally. Free, private.",
            Provider::Anthropic => "Uses the Claude API. Requires an API key, best quality.",
        }
    }

    pub fn requires_api_key(self) -> bool {
        self == Provider::Anthropic
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_device" | "on-device" | "ondevice" => Ok(Provider::OnDevice),
            "local" | "mlx" => Ok(Provider::Local),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(format!(
                "Unknown provider: {}. Use on_device, local or anthropic",
                other
            )),
        }
    }
}

/// Settings for the daemon-backed on-device provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnDeviceConfig {
    pub host: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OnDeviceConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OnDeviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for downloaded models and the runtime that serves them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalRuntimeConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub hub_url: String,
    pub models_dir: Option<PathBuf>,
}

impl Default for LocalRuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 300,
            hub_url: "https://huggingface.co".to_string(),
            models_dir: None,
        }
    }
}

impl LocalRuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `models_dir`, or `<data_dir>/hn-catchup/models`.
    pub fn resolved_models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("hn-catchup")
                .join("models")
        })
    }
}

/// Provider selection plus provider-specific parameters.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub local_model_id: String,
    pub on_device: OnDeviceConfig,
    pub local: LocalRuntimeConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            anthropic_api_key: String::new(),
            anthropic_model: anthropic::DEFAULT_MODEL.to_string(),
            local_model_id: MODEL_CATALOG[0].id.to_string(),
            on_device: OnDeviceConfig::default(),
            local: LocalRuntimeConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn is_anthropic_configured(&self) -> bool {
        !self.anthropic_api_key.trim().is_empty()
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field(
                "anthropic_api_key",
                &(!self.anthropic_api_key.is_empty()).then_some("<redacted>"),
            )
            .field("anthropic_model", &self.anthropic_model)
            .field("local_model_id", &self.local_model_id)
            .field("on_device", &self.on_device)
            .field("local", &self.local)
            .finish()
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Implemented by backends that fetch a large artifact before first use.
///
/// Values are fractions in `0.0..=1.0`; within one download they never
/// decrease and the last one is `1.0`.
pub trait DownloadProgressSource {
    fn subscribe_progress(&self) -> watch::Receiver<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("on_device".parse::<Provider>(), Ok(Provider::OnDevice));
        assert_eq!("Claude".parse::<Provider>(), Ok(Provider::Anthropic));
        assert_eq!("mlx".parse::<Provider>(), Ok(Provider::Local));
        assert!("gpt".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_round_trips_through_display() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn test_only_anthropic_requires_key() {
        assert!(Provider::Anthropic.requires_api_key());
        assert!(!Provider::OnDevice.requires_api_key());
        assert!(!Provider::Local.requires_api_key());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = LlmConfig {
            anthropic_api_key: "sk-ant-secret".into(),
            ..LlmConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-ant-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(config.is_anthropic_configured());
    }

    #[test]
    fn test_models_dir_override() {
        let config = LocalRuntimeConfig {
            models_dir: Some(PathBuf::from("/tmp/models")),
            ..LocalRuntimeConfig::default()
        };
        assert_eq!(config.resolved_models_dir(), PathBuf::from("/tmp/models"));
    }
}
