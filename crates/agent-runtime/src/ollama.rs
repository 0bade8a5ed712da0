//! Ollama Inference Engine
//!
//! Implementation of `InferenceEngine` for local Ollama inference. Prompts
//! are rendered client-side with a [`ChatTemplate`] and sent in raw mode, so
//! the daemon applies no template of its own.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    engine::{GenerationOptions, InferenceEngine, ModelHandle, ModelInfo, ModelInput},
    error::{AgentError, Result},
    message::Message,
    tool::ToolSchema,
};
use async_trait::async_trait;
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};

use crate::template::ChatTemplate;

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Prompt dialect of the served model; `None` picks it from the model name
    pub template: Option<ChatTemplate>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
            template: None,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);
        let template = match std::env::var("OLLAMA_TEMPLATE") {
            Ok(raw) => match raw.parse() {
                Ok(template) => Some(template),
                Err(e) => {
                    tracing::warn!("Ignoring OLLAMA_TEMPLATE: {}", e);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            host,
            port,
            template,
            ..Default::default()
        }
    }

    fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    /// Template to render prompts for `model` with
    pub fn template_for(&self, model: &str) -> ChatTemplate {
        self.template.unwrap_or_else(|| ChatTemplate::for_model(model))
    }
}

/// Ollama inference engine
pub struct OllamaEngine {
    client: Ollama,
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaEngine {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Ollama::new(&config.host, config.port),
            http,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::from_config(OllamaConfig::default())
    }
}

/// Whether a local model tag satisfies a requested model name
fn model_matches(local: &str, requested: &str) -> bool {
    local == requested || (!requested.contains(':') && local == format!("{}:latest", requested))
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    async fn load(&self, options: &GenerationOptions) -> Result<Arc<dyn ModelHandle>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::EngineUnavailable(e.to_string()))?;

        if !models.iter().any(|m| model_matches(&m.name, &options.model)) {
            return Err(AgentError::EngineUnavailable(format!(
                "model '{}' is not available; run `ollama pull {}`",
                options.model, options.model
            )));
        }

        let template = self.config.template_for(&options.model);
        tracing::info!(model = %options.model, ?template, "Ollama model ready");

        Ok(Arc::new(OllamaHandle {
            http: self.http.clone(),
            endpoint: format!("{}/api/generate", self.config.base_url()),
            model: options.model.clone(),
            template,
        }))
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::EngineUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None, // Not exposed by the list endpoint
            })
            .collect())
    }
}

/// A model known to be present on the daemon
pub struct OllamaHandle {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    template: ChatTemplate,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    raw: bool,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
}

#[async_trait]
impl ModelHandle for OllamaHandle {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn render(&self, turns: &[Message], tools: &[ToolSchema]) -> Result<ModelInput> {
        self.template.render(turns, tools).map(ModelInput::new)
    }

    async fn generate(&self, input: &ModelInput, options: &GenerationOptions) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: &input.prompt,
            raw: true,
            stream: false,
            options: GenerateOptions {
                num_predict: options.max_new_tokens,
                temperature: options.temperature,
                top_p: options.top_p,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AgentError::Engine(e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Engine(format!("invalid generate response: {}", e)))?;

        if body.done_reason.as_deref() == Some("length") {
            tracing::warn!(
                max_new_tokens = options.max_new_tokens,
                "Generation truncated at the token ceiling"
            );
        }

        // Raw mode returns only the continuation; rebuild the full sequence
        Ok(format!("{}{}", input.prompt, body.response))
    }

    fn eos_marker(&self) -> Option<&str> {
        self.template.eos_marker()
    }
}
