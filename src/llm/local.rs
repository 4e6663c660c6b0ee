//! Locally run models.
//!
//! A model is picked from [`MODEL_CATALOG`], downloaded once from the model
//! hub into the models directory, and served by an OpenAI-compatible runtime
//! (llama.cpp's `llama-server` or similar). Loaded models are cached per id,
//! and concurrent requests for the same id share one load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex, OnceCell};

use super::{DownloadProgressSource, GenerationBackend, LlmError, LocalRuntimeConfig, ProgressReporter};

const TEMPERATURE: f32 = 0.7;

/// An entry of the local model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    /// Hub repository id, also the key models are cached under.
    pub id: &'static str,
    pub display_name: &'static str,
    pub size: &'static str,
    pub description: &'static str,
    /// Weights file inside the repository.
    pub file: &'static str,
}

pub const MODEL_CATALOG: &[ModelOption] = &[
    ModelOption {
        id: "Qwen/Qwen3-0.6B-GGUF",
        display_name: "Qwen3 0.6B",
        size: "~640MB",
        description: "Fastest, minimal memory",
        file: "Qwen3-0.6B-Q8_0.gguf",
    },
    ModelOption {
        id: "Qwen/Qwen3-4B-GGUF",
        display_name: "Qwen3 4B",
        size: "~2.5GB",
        description: "Best balance of speed and quality",
        file: "Qwen3-4B-Q4_K_M.gguf",
    },
    ModelOption {
        id: "bartowski/Llama-3.2-3B-Instruct-GGUF",
        display_name: "Llama 3.2 3B",
        size: "~2GB",
        description: "Good quality, moderate size",
        file: "Llama-3.2-3B-Instruct-Q4_K_M.gguf",
    },
];

impl ModelOption {
    pub fn default_option() -> &'static ModelOption {
        &MODEL_CATALOG[0]
    }

    pub fn find(id: &str) -> Option<&'static ModelOption> {
        MODEL_CATALOG.iter().find(|option| option.id == id)
    }

    /// Catalog entry for `id`, or the default entry for unknown ids.
    pub fn resolve(id: &str) -> &'static ModelOption {
        Self::find(id).unwrap_or_else(|| {
            let fallback = Self::default_option();
            tracing::warn!("Unknown local model {}, using {}", id, fallback.id);
            fallback
        })
    }
}

/// A model ready to answer prompts.
#[async_trait]
pub trait LoadedModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Turns a catalog entry into a [`LoadedModel`], downloading it if needed.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(
        &self,
        option: &ModelOption,
        progress: &ProgressReporter,
    ) -> Result<Arc<dyn LoadedModel>, LlmError>;
}

type ModelSlot = Arc<OnceCell<Arc<dyn LoadedModel>>>;

pub struct LocalModelBackend {
    loader: Arc<dyn ModelLoader>,
    models: Mutex<HashMap<&'static str, ModelSlot>>,
    progress: ProgressReporter,
}

impl LocalModelBackend {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: Mutex::new(HashMap::new()),
            progress: ProgressReporter::new(),
        }
    }

    pub fn from_config(client: Client, config: &LocalRuntimeConfig) -> Self {
        Self::new(Arc::new(HubModelLoader::new(client, config)))
    }

    /// Load `model_id`, reusing a cached or in-flight load of the same model.
    pub async fn load(&self, model_id: &str) -> Result<Arc<dyn LoadedModel>, LlmError> {
        let option = ModelOption::resolve(model_id);
        let slot = {
            let mut models = self.models.lock().await;
            models.entry(option.id).or_default().clone()
        };

        if let Some(model) = slot.get() {
            tracing::debug!("Using cached model {}", option.id);
            return Ok(model.clone());
        }

        let model = slot
            .get_or_try_init(|| async {
                tracing::info!("Loading local model {}", option.id);
                let _progress = self.progress.start();
                let loaded = self.loader.load(option, &self.progress).await?;
                tracing::info!("Local model {} ready", option.id);
                Ok::<_, LlmError>(loaded)
            })
            .await?;

        Ok(model.clone())
    }

    pub async fn is_loaded(&self, model_id: &str) -> bool {
        let Some(option) = ModelOption::find(model_id) else {
            return false;
        };
        self.models
            .lock()
            .await
            .get(option.id)
            .is_some_and(|slot| slot.initialized())
    }

    pub async fn generate_with(&self, model_id: &str, prompt: &str) -> Result<String, LlmError> {
        self.load(model_id).await?.complete(prompt).await
    }

    /// A [`GenerationBackend`] bound to one model of this cache.
    pub fn for_model(self: &Arc<Self>, model_id: &str) -> LocalModel {
        LocalModel {
            backend: Arc::clone(self),
            model_id: model_id.to_string(),
        }
    }
}

impl DownloadProgressSource for LocalModelBackend {
    fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }
}

pub struct LocalModel {
    backend: Arc<LocalModelBackend>,
    model_id: String,
}

#[async_trait]
impl GenerationBackend for LocalModel {
    fn name(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.backend.generate_with(&self.model_id, prompt).await
    }
}

/// Downloads weights from the model hub and serves them through the runtime.
pub struct HubModelLoader {
    client: Client,
    hub_url: String,
    models_dir: PathBuf,
    endpoint: String,
    timeout: Duration,
}

impl HubModelLoader {
    pub fn new(client: Client, config: &LocalRuntimeConfig) -> Self {
        Self {
            client,
            hub_url: config.hub_url.trim_end_matches('/').to_string(),
            models_dir: config.resolved_models_dir(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        }
    }

    pub fn model_path(&self, option: &ModelOption) -> PathBuf {
        model_path(&self.models_dir, option)
    }

    async fn download(
        &self,
        option: &ModelOption,
        path: &Path,
        progress: &ProgressReporter,
    ) -> Result<(), LlmError> {
        let failed = |message: String| LlmError::Download {
            model_id: option.id.to_string(),
            message,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let url = format!("{}/{}/resolve/main/{}", self.hub_url, option.id, option.file);
        tracing::info!("Downloading {} ({}) from {}", option.display_name, option.size, url);

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;

        let partial = path.with_extension("part");
        let received = match write_partial(&mut response, &partial, option, progress).await {
            Ok(0) => Err(failed("empty download".to_string())),
            Ok(received) => tokio::fs::rename(&partial, path)
                .await
                .map(|_| received)
                .map_err(LlmError::from),
            Err(e) => Err(e),
        };

        let received = match received {
            Ok(received) => received,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tracing::info!("Downloaded {} bytes to {}", received, path.display());
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for HubModelLoader {
    async fn load(
        &self,
        option: &ModelOption,
        progress: &ProgressReporter,
    ) -> Result<Arc<dyn LoadedModel>, LlmError> {
        let path = self.model_path(option);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Model {} found at {}", option.id, path.display());
        } else {
            self.download(option, &path, progress).await?;
        }

        Ok(Arc::new(ServedModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            path,
            timeout: self.timeout,
        }))
    }
}

/// Stream the response body into `partial`, returning the bytes written.
async fn write_partial(
    response: &mut reqwest::Response,
    partial: &Path,
    option: &ModelOption,
    progress: &ProgressReporter,
) -> Result<u64, LlmError> {
    let total = response.content_length().filter(|len| *len > 0);
    let mut file = tokio::fs::File::create(partial).await?;
    let mut received: u64 = 0;

    while let Some(chunk) = response.chunk().await.map_err(|e| LlmError::Download {
        model_id: option.id.to_string(),
        message: e.to_string(),
    })? {
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        if let Some(total) = total {
            progress.report(received as f64 / total as f64);
        }
    }
    file.flush().await?;
    Ok(received)
}

/// `<models_dir>/<owner>--<repo>/<file>`
fn model_path(models_dir: &Path, option: &ModelOption) -> PathBuf {
    models_dir.join(option.id.replace('/', "--")).join(option.file)
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: String,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

struct ServedModel {
    client: Client,
    endpoint: String,
    path: PathBuf,
    timeout: Duration,
}

#[async_trait]
impl LoadedModel for ServedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: self.path.display().to_string(),
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Unavailable(format!(
                        "Local model runtime is not reachable at {}",
                        self.endpoint
                    ))
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "local",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .map(|choice| choice.message.content)
            .find(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse(self.path.display().to_string()))
    }
}
