use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{
    AnthropicBackend, DownloadProgressSource, GenerationBackend, LlmConfig, LlmError,
    LocalModelBackend, OnDeviceBackend, Provider,
};

/// Picks a backend from the configuration on every call.
///
/// The local model cache lives here, so it survives provider switches and
/// is shared by every caller of the same service.
pub struct GenerationService {
    client: Client,
    local: Arc<LocalModelBackend>,
    overrides: HashMap<Provider, Arc<dyn GenerationBackend>>,
}

impl GenerationService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(concat!("hn-catchup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let local = Arc::new(LocalModelBackend::from_config(client.clone(), &config.local));
        Ok(Self::with_parts(client, local))
    }

    pub fn with_parts(client: Client, local: Arc<LocalModelBackend>) -> Self {
        Self {
            client,
            local,
            overrides: HashMap::new(),
        }
    }

    /// Route every request for `provider` to `backend`.
    pub fn with_backend(mut self, provider: Provider, backend: Arc<dyn GenerationBackend>) -> Self {
        self.overrides.insert(provider, backend);
        self
    }

    pub fn local_models(&self) -> &Arc<LocalModelBackend> {
        &self.local
    }

    /// Backend for the provider `config` selects.
    pub fn backend_for(&self, config: &LlmConfig) -> Result<Arc<dyn GenerationBackend>, LlmError> {
        if let Some(backend) = self.overrides.get(&config.provider) {
            return Ok(Arc::clone(backend));
        }

        let backend: Arc<dyn GenerationBackend> = match config.provider {
            Provider::OnDevice => Arc::new(OnDeviceBackend::new(self.client.clone(), &config.on_device)),
            Provider::Local => Arc::new(self.local.for_model(&config.local_model_id)),
            Provider::Anthropic => Arc::new(AnthropicBackend::new(
                self.client.clone(),
                &config.anthropic_api_key,
                &config.anthropic_model,
            )?),
        };
        Ok(backend)
    }

    pub async fn generate(&self, prompt: &str, config: &LlmConfig) -> Result<String, LlmError> {
        let backend = self.backend_for(config)?;
        tracing::info!("Generating with {} ({})", config.provider, backend.name());

        let started = Instant::now();
        let text = backend.generate(prompt).await?;
        tracing::info!(
            "Generated {} chars in {:.1}s",
            text.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(text)
    }

    pub fn subscribe_download_progress(&self) -> watch::Receiver<f64> {
        self.local.subscribe_progress()
    }

    /// Call `callback` with every progress update until the service is dropped.
    pub fn on_download_progress<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(f64) + Send + 'static,
    {
        let mut rx = self.subscribe_download_progress();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let value = *rx.borrow_and_update();
                callback(value);
            }
        })
    }
}
