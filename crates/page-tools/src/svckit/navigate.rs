//! Navigate Tool
//!
//! Sends the user to another page. The result text tells the model what to
//! say about it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolArguments, ToolSchema};

use crate::error::ToolkitError;
use crate::navigation::Navigator;

/// Tool performing navigation through a [`Navigator`]
pub struct NavigateTool {
    navigator: Arc<dyn Navigator>,
    routes: Vec<String>,
}

impl NavigateTool {
    pub fn new(navigator: Arc<dyn Navigator>, routes: Vec<String>) -> Self {
        Self { navigator, routes }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn schema(&self) -> ToolSchema {
        let mut path = ParameterSchema::new("path", "string", "Destination path, e.g. '/pricing'").required();
        if !self.routes.is_empty() {
            path = path.with_enum(self.routes.iter().cloned().map(Value::String).collect());
        }

        ToolSchema {
            name: "navigate".into(),
            description: "Navigate the user to another page of the site. Use it when the user asks to go somewhere or when another page answers their question.".into(),
            parameters: vec![path],
            category: Some("navigation".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<String> {
        let path = arguments
            .get("path")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolkitError::MissingArgument("path".into()))?;

        if !self.routes.is_empty() && !self.routes.iter().any(|r| r == path) {
            return Err(ToolkitError::UnknownRoute(format!(
                "{} (known routes: {})",
                path,
                self.routes.join(", ")
            ))
            .into());
        }

        self.navigator.navigate(path)?;
        tracing::info!(path, "Navigation requested by assistant");

        Ok(format!("Tell the user you navigated to {}.", path))
    }
}
