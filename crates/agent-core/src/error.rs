//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Generation failed inside the inference engine
    #[error("Engine error: {0}")]
    Engine(String),

    /// Model or tokenizer could not be acquired
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool with the same name is already registered
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool did not settle within the dispatcher timeout
    #[error("Tool '{name}' timed out after {after:?}")]
    ToolTimeout { name: String, after: Duration },

    /// Parse error (e.g., tool call payload)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The round was cancelled by the caller
    #[error("Conversation round cancelled")]
    Cancelled,

    /// A round is already in flight for this conversation
    #[error("Conversation busy: {0}")]
    Busy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::EngineUnavailable(_) | AgentError::Busy(_) | AgentError::Io(_)
        )
    }

    /// Whether the failure belongs to the inference engine and must be surfaced to the caller
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, AgentError::Engine(_) | AgentError::EngineUnavailable(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Engine(_) => "Something went wrong while generating an answer. Please try again.".into(),
            AgentError::EngineUnavailable(_) => "The assistant model is currently unavailable. Please try again.".into(),
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::ToolTimeout { name, .. } => format!("The tool '{}' took too long to respond.", name),
            AgentError::Cancelled => "The request was cancelled.".into(),
            AgentError::Busy(_) => "Still working on your previous question. Please wait.".into(),
            AgentError::Config(msg) => format!("Invalid request: {}", msg),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failures_are_visible() {
        let err = AgentError::Engine("CUDA out of memory".into());
        assert!(err.is_engine_failure());
        assert!(err.user_message().contains("Something went wrong"));
        assert!(!AgentError::ToolNotFound("x".into()).is_engine_failure());
    }

    #[test]
    fn test_retryable() {
        assert!(AgentError::Busy("s1".into()).is_retryable());
        assert!(!AgentError::Cancelled.is_retryable());
    }
}
