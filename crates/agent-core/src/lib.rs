//! # agent-core
//!
//! Tool-augmented conversation orchestrator. A model converses with the user
//! and, mid-conversation, requests tools whose results are folded back in
//! before the final answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │ ModelAdapter│─▶│   parser    │─▶│ Dispatcher │─▶│Conversation│ │
//! │  │  (engine)   │  │ (tool calls)│  │ (registry) │  │  (turns)   │ │
//! │  └─────────────┘  └─────────────┘  └────────────┘  └───────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `InferenceEngine` trait keeps the loop independent of the model
//! backend; tools are supplied per conversation context through a
//! `ToolRegistry`.

pub mod adapter;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod parser;
pub mod session;
pub mod tool;

#[cfg(test)]
mod testing;

pub use adapter::ModelAdapter;
pub use dispatcher::ToolDispatcher;
pub use engine::{GenerationOptions, InferenceEngine, ModelHandle, ModelInput};
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{LoopState, Orchestrator, OrchestratorBuilder, OrchestratorConfig};
pub use parser::{Fragment, ParsedResponse};
pub use session::{ChatSession, SessionId, SessionStore};
pub use tool::{FnTool, ParameterSchema, Tool, ToolArguments, ToolCall, ToolRegistry, ToolResult, ToolSchema};
