//! Backend for the model daemon running on this machine.
//!
//! Speaks the Ollama generate API: one non-streaming `POST /api/generate`
//! per prompt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, LlmError, OnDeviceConfig};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OnDeviceBackend {
    client: Client,
    host: String,
    model: String,
    timeout: Duration,
}

impl OnDeviceBackend {
    pub fn new(client: Client, config: &OnDeviceConfig) -> Self {
        Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }

    fn unavailable(&self) -> LlmError {
        LlmError::Unavailable(format!(
            "On-device model is not available. Is the model daemon running at {}?",
            self.host
        ))
    }
}

#[async_trait]
impl GenerationBackend for OnDeviceBackend {
    fn name(&self) -> &str {
        "on-device"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.host);
        tracing::debug!("Generating with {} via {}", self.model, url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.unavailable()
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "on-device",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        if parsed.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse(self.model.clone()));
        }
        Ok(parsed.response)
    }
}
