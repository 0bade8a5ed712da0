//! Inference Engine Interface
//!
//! The narrow surface the orchestrator needs from a model backend. Loading a
//! model is split from using it: [`InferenceEngine::load`] is the expensive
//! one-time acquisition, the returned [`ModelHandle`] renders and generates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::engine::InferenceEngine;
//!
//! let handle = engine.load(&options).await?;
//! let input = handle.render(conversation.messages(), &registry.schemas())?;
//! let sequence = handle.generate(&input, &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;
use crate::tool::ToolSchema;

/// Configuration for generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "granite3.1-dense:2b", "qwen2.5:3b")
    pub model: String,

    /// Upper bound on newly generated tokens; longer output is truncated
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    /// Temperature for sampling (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_new_tokens() -> u32 { 1000 }
fn default_temperature() -> f32 { 0.2 }
fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "granite3.1-dense:2b".into(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Rendered chat-template input, generation prompt appended
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInput {
    pub prompt: String,
}

impl ModelInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into() }
    }

    /// Length of the input prefix inside a generated sequence
    pub fn len(&self) -> usize {
        self.prompt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompt.is_empty()
    }
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// A loaded model/tokenizer pair
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Identifier of the loaded model
    fn model_id(&self) -> &str;

    /// Render turns and tool descriptors into the model's chat template,
    /// ending with the assistant generation prompt
    fn render(&self, turns: &[Message], tools: &[ToolSchema]) -> Result<ModelInput>;

    /// Generate a continuation.
    ///
    /// Returns the whole sequence: the rendered input followed by the new text.
    async fn generate(&self, input: &ModelInput, options: &GenerationOptions) -> Result<String>;

    /// End-of-sequence marker text the decoder may leave in the output
    fn eos_marker(&self) -> Option<&str> {
        None
    }
}

/// Strategy trait for model backends
///
/// Implement this trait to add support for new inference engines.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Acquire the model and tokenizer. Expensive; callers memoize the handle.
    async fn load(&self, options: &GenerationOptions) -> Result<Arc<dyn ModelHandle>>;

    /// Check if the engine is reachable
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}
