//! Scripted inference engine for tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{GenerationOptions, InferenceEngine, ModelHandle, ModelInput};
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::ToolSchema;

pub const EOS: &str = "<|eos|>";

#[derive(Default)]
struct Script {
    steps: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    loads: AtomicUsize,
    load_error: Option<String>,
}

/// Replays canned continuations in order
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Script>,
}

impl ScriptedEngine {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = responses.into_iter().map(|s| Ok(s.into())).collect();
        Self {
            script: Arc::new(Script {
                steps: Mutex::new(steps),
                ..Default::default()
            }),
        }
    }

    pub fn failing_load(message: &str) -> Self {
        Self {
            script: Arc::new(Script {
                load_error: Some(message.to_string()),
                ..Default::default()
            }),
        }
    }

    /// Queue a generation failure after the scripted responses
    pub fn then_fail(self, message: &str) -> Self {
        self.script
            .steps
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn loads(&self) -> usize {
        self.script.loads.load(Ordering::SeqCst)
    }

    /// Every prompt rendered so far
    pub fn prompts(&self) -> Vec<String> {
        self.script.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn load(&self, _options: &GenerationOptions) -> Result<Arc<dyn ModelHandle>> {
        self.script.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        match &self.script.load_error {
            Some(message) => Err(AgentError::EngineUnavailable(message.clone())),
            None => Ok(Arc::new(self.clone())),
        }
    }
}

#[async_trait]
impl ModelHandle for ScriptedEngine {
    fn model_id(&self) -> &str {
        "scripted"
    }

    fn render(&self, turns: &[Message], tools: &[ToolSchema]) -> Result<ModelInput> {
        let mut prompt = String::new();
        for tool in tools {
            prompt.push_str(&format!("<|tool_def|>{}\n", tool.name));
        }
        for turn in turns {
            prompt.push_str(&format!("<|{}|>{}\n", turn.role, turn.content));
        }
        prompt.push_str("<|assistant|>");
        self.script.prompts.lock().unwrap().push(prompt.clone());
        Ok(ModelInput::new(prompt))
    }

    async fn generate(&self, input: &ModelInput, _options: &GenerationOptions) -> Result<String> {
        let step = self.script.steps.lock().unwrap().pop_front();
        match step {
            Some(Ok(text)) => Ok(format!("{}{}{}", input.prompt, text, EOS)),
            Some(Err(message)) => Err(AgentError::Engine(message)),
            None => Err(AgentError::Engine("script exhausted".into())),
        }
    }

    fn eos_marker(&self) -> Option<&str> {
        Some(EOS)
    }
}
