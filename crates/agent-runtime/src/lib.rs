//! # agent-runtime
//!
//! Inference engines for the page assistant.
//!
//! ## Engines
//!
//! - **Ollama** (default): local inference via an Ollama daemon in raw-prompt mode
//!
//! ## Templates
//!
//! Prompts are rendered client-side: ChatML, Granite 3, or a plain markdown
//! layout for base models.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::ollama::OllamaEngine;
//!
//! let engine = OllamaEngine::from_env()?;
//! let agent = OrchestratorBuilder::new()
//!     .engine(Arc::new(engine))
//!     .build()?;
//! ```

pub mod template;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaEngine};

pub use template::ChatTemplate;

// Re-export core types for convenience
pub use agent_core::{
    AgentError, InferenceEngine, Message, ModelHandle, Orchestrator, Result, Role, ToolRegistry,
};
