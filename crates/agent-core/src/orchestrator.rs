//! Orchestration Loop
//!
//! Drives one conversation through its rounds: render and generate, parse
//! the reply, run requested tools concurrently, feed their results back, and
//! stop at the first reply that requests no tools.
//!
//! ```text
//! AwaitingUserInput ─ask─▶ Generating ─▶ ParsingResponse ─┬─▶ Done ─▶ AwaitingUserInput
//!                              ▲                          │
//!                              └────── ExecutingTools ◀───┘ (tool calls present)
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapter::ModelAdapter;
use crate::dispatcher::{join_results, ToolDispatcher};
use crate::engine::{GenerationOptions, InferenceEngine};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::parser;
use crate::tool::{Tool, ToolRegistry};

/// Loop states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Idle, ready for the next question
    AwaitingUserInput,
    /// Model invocation in flight
    Generating,
    /// Splitting the reply into prose and tool calls
    ParsingResponse,
    /// Tool calls of the current round in flight
    ExecutingTools,
    /// Final answer produced
    Done,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::AwaitingUserInput => "awaiting_user_input",
            LoopState::Generating => "generating",
            LoopState::ParsingResponse => "parsing_response",
            LoopState::ExecutingTools => "executing_tools",
            LoopState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// System prompt opening every conversation
    pub system_prompt: String,

    /// Maximum rounds per question before the fallback answer is used
    pub max_rounds: usize,

    /// Per tool call timeout; `None` waits forever
    pub tool_timeout: Option<Duration>,

    /// Answer returned when the round cap is hit
    pub round_limit_message: String,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_rounds: 8,
            tool_timeout: Some(Duration::from_secs(30)),
            round_limit_message: ROUND_LIMIT_MESSAGE.into(),
            generation: GenerationOptions::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `AGENT_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(prompt) = std::env::var("AGENT_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        if let Ok(model) = std::env::var("AGENT_MODEL") {
            config.generation.model = model;
        }
        if let Some(max) = env_parse::<u32>("AGENT_MAX_NEW_TOKENS")? {
            config.generation.max_new_tokens = max;
        }
        if let Some(rounds) = env_parse::<usize>("AGENT_MAX_ROUNDS")? {
            config.max_rounds = rounds;
        }
        if let Some(secs) = env_parse::<u64>("AGENT_TOOL_TIMEOUT_SECS")? {
            config.tool_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(AgentError::Config("max_rounds must be at least 1".into()));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(AgentError::Config("max_new_tokens must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AgentError::Config(format!("{}={}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant embedded in a website.

When you need to use a tool, respond with a block in this exact format:
<tool_call>
{"name": "tool_name", "arguments": {"arg1": "value1"}}
</tool_call>

You may request several tools at once with one block per call.
After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate."#;

const ROUND_LIMIT_MESSAGE: &str =
    "I'm sorry, I was unable to complete that request. Please try rephrasing your question.";

/// Owns one conversation and runs the round loop over it
pub struct Orchestrator {
    adapter: Arc<ModelAdapter>,
    dispatcher: ToolDispatcher,
    config: OrchestratorConfig,
    conversation: Conversation,
    state: LoopState,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(adapter: Arc<ModelAdapter>, tools: Arc<ToolRegistry>, config: OrchestratorConfig) -> Self {
        let dispatcher = ToolDispatcher::new(tools).with_timeout(config.tool_timeout);
        Self {
            adapter,
            dispatcher,
            config,
            conversation: Conversation::new(),
            state: LoopState::AwaitingUserInput,
        }
    }

    /// Submit a question and resolve with the final answer
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        self.ask_with_cancellation(question, &CancellationToken::new()).await
    }

    /// Like [`Orchestrator::ask`], checking `cancel` before every state transition
    pub async fn ask_with_cancellation(&mut self, question: &str, cancel: &CancellationToken) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::Config("question must not be empty".into()));
        }

        let result = self.run(question, cancel).await;
        self.state = LoopState::AwaitingUserInput;

        if let Err(e) = &result {
            tracing::error!(error = %e, turns = self.conversation.len(), "Round failed");
        }
        result
    }

    async fn run(&mut self, question: &str, cancel: &CancellationToken) -> Result<String> {
        if self.conversation.ensure_system(&self.config.system_prompt) {
            tracing::info!("Conversation started");
        }
        self.conversation.push(Message::user(question))?;

        for round in 1..=self.config.max_rounds {
            self.transition(LoopState::Generating, cancel)?;
            let raw = self
                .adapter
                .respond(&self.conversation, self.dispatcher.registry())
                .await?;
            self.conversation.push(Message::assistant(&raw))?;

            self.transition(LoopState::ParsingResponse, cancel)?;
            let parsed = parser::parse(&raw);

            if !parsed.has_tool_calls() {
                self.transition(LoopState::Done, cancel)?;
                tracing::debug!(round, "Final answer produced");
                return Ok(parsed.message);
            }

            self.transition(LoopState::ExecutingTools, cancel)?;
            tracing::debug!(round, calls = parsed.tool_calls.len(), "Dispatching tool calls");
            let results = self.dispatcher.dispatch(&parsed.tool_calls).await;
            self.conversation.push(Message::tool(join_results(&results)))?;
        }

        tracing::warn!(max_rounds = self.config.max_rounds, "Round limit reached");
        let fallback = self.config.round_limit_message.clone();
        self.conversation.push(Message::assistant(&fallback))?;
        self.transition(LoopState::Done, cancel)?;
        Ok(fallback)
    }

    fn transition(&mut self, next: LoopState, cancel: &CancellationToken) -> Result<()> {
        if next != LoopState::Done && cancel.is_cancelled() {
            tracing::info!(state = %self.state, "Round cancelled");
            return Err(AgentError::Cancelled);
        }
        tracing::trace!(from = %self.state, to = %next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Forget the conversation; the next question starts over with the system prompt
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.state = LoopState::AwaitingUserInput;
    }

    /// Swap in a registry rebuilt from fresh context
    pub fn set_tools(&mut self, tools: Arc<ToolRegistry>) {
        self.dispatcher = ToolDispatcher::new(tools).with_timeout(self.config.tool_timeout);
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Get configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

/// Builder for Orchestrator configuration
pub struct OrchestratorBuilder {
    engine: Option<Arc<dyn InferenceEngine>>,
    adapter: Option<Arc<ModelAdapter>>,
    tools: Vec<Arc<dyn Tool>>,
    registry: Option<ToolRegistry>,
    config: OrchestratorConfig,
    generation_set: bool,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            adapter: None,
            tools: Vec::new(),
            registry: None,
            config: OrchestratorConfig::default(),
            generation_set: false,
        }
    }

    pub fn engine(mut self, engine: Arc<dyn InferenceEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Share an already constructed adapter (and its loaded model).
    ///
    /// The adapter's generation options apply; combining it with
    /// [`model`](Self::model) or [`max_new_tokens`](Self::max_new_tokens) is a
    /// configuration error when they disagree.
    pub fn adapter(mut self, adapter: Arc<ModelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.registry = Some(tools);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self.generation_set = true;
        self
    }

    pub fn max_new_tokens(mut self, max: u32) -> Self {
        self.config.generation.max_new_tokens = max;
        self.generation_set = true;
        self
    }

    pub fn max_rounds(mut self, max: usize) -> Self {
        self.config.max_rounds = max;
        self
    }

    pub fn tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn build(mut self) -> Result<Orchestrator> {
        self.config.validate()?;

        let adapter = match (self.adapter, self.engine) {
            (Some(adapter), _) => {
                if self.generation_set && self.config.generation != *adapter.options() {
                    return Err(AgentError::Config(
                        "generation options conflict with the shared adapter's".into(),
                    ));
                }
                self.config.generation = adapter.options().clone();
                adapter
            }
            (None, Some(engine)) => Arc::new(ModelAdapter::new(engine, self.config.generation.clone())),
            (None, None) => return Err(AgentError::Config("Engine is required".into())),
        };

        let mut registry = self.registry.unwrap_or_default();
        for tool in self.tools {
            registry.register_arc(tool)?;
        }

        Ok(Orchestrator::new(adapter, Arc::new(registry), self.config))
    }
}
