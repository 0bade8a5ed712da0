//! Error Types for Page Tools

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolkitError>;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Search error: {0}")]
    Search(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ToolkitError> for AgentError {
    fn from(err: ToolkitError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}
