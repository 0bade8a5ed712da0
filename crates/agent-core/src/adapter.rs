//! Model Request Adapter
//!
//! Bridges a conversation to the inference engine and normalizes the output
//! into plain assistant text. The model handle is acquired once and shared by
//! every round (and every session holding the same adapter).

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::engine::{GenerationOptions, InferenceEngine, ModelHandle, ModelInput};
use crate::error::{AgentError, Result};
use crate::message::Conversation;
use crate::tool::ToolRegistry;

/// Memoizing front end over an [`InferenceEngine`]
pub struct ModelAdapter {
    engine: Arc<dyn InferenceEngine>,
    handle: OnceCell<Arc<dyn ModelHandle>>,
    options: GenerationOptions,
}

impl ModelAdapter {
    pub fn new(engine: Arc<dyn InferenceEngine>, options: GenerationOptions) -> Self {
        Self {
            engine,
            handle: OnceCell::new(),
            options,
        }
    }

    /// Loaded model handle, acquiring it on first use.
    ///
    /// Concurrent first callers wait on the same acquisition.
    pub async fn handle(&self) -> Result<Arc<dyn ModelHandle>> {
        self.handle
            .get_or_try_init(|| async {
                tracing::info!(model = %self.options.model, "Loading model");
                self.engine.load(&self.options).await
            })
            .await
            .cloned()
    }

    /// Acquire the model eagerly, e.g. at session or server start
    pub async fn warm_up(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }

    pub fn engine(&self) -> &Arc<dyn InferenceEngine> {
        &self.engine
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Render the conversation, generate, and return the raw assistant text
    /// (tool-call blocks still embedded)
    pub async fn respond(&self, conversation: &Conversation, tools: &ToolRegistry) -> Result<String> {
        let handle = self.handle().await?;
        let input = handle.render(conversation.messages(), &tools.schemas())?;

        let sequence = handle.generate(&input, &self.options).await?;
        let text = extract_continuation(&sequence, &input, handle.eos_marker())?;

        tracing::debug!(
            model = handle.model_id(),
            input_len = input.len(),
            output_len = text.len(),
            "Generated continuation"
        );
        Ok(text)
    }
}

/// Slice the new continuation off a generated sequence and strip EOS markers
pub fn extract_continuation(sequence: &str, input: &ModelInput, eos_marker: Option<&str>) -> Result<String> {
    let continuation = sequence.get(input.len()..).ok_or_else(|| {
        AgentError::Engine(format!(
            "generated sequence ({} bytes) does not extend its input ({} bytes)",
            sequence.len(),
            input.len()
        ))
    })?;

    let text = match eos_marker {
        Some(marker) if !marker.is_empty() => continuation.replace(marker, ""),
        _ => continuation.to_string(),
    };

    Ok(text.trim().to_string())
}
