//! Tool System
//!
//! Capability contract exposed to the model and the per-session registry
//! holding the active tools. Registries are built fresh for each context
//! snapshot; there is no global registry.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Untyped arguments as produced by the parser
pub type ToolArguments = Map<String, Value>;

/// Tool call request parsed from model output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: ToolArguments,

    /// Call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success payload or error description)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Text placed into the following tool turn.
    ///
    /// Successful output is passed through verbatim so tools can address the
    /// model directly ("Tell the user ...").
    pub fn to_turn_text(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("[Tool '{}' failed]\n{}", self.name, self.output)
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            default: None,
            enum_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Tool definition schema, advertised to the model.
///
/// The schema is descriptive only: arguments are not validated against it
/// before execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            category: None,
            has_side_effects: false,
        }
    }

    pub fn parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// JSON Schema object describing the accepted arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), json!(param.param_type));
            property.insert("description".into(), json!(param.description));
            if let Some(default) = &param.default {
                property.insert("default".into(), default.clone());
            }
            if let Some(values) = &param.enum_values {
                property.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Function-style entry consumed by chat templates
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema(),
            }
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for the model
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the parsed arguments.
    ///
    /// The returned text is placed verbatim into the next tool turn.
    async fn execute(&self, arguments: &ToolArguments) -> Result<String>;
}

type ToolHandler = dyn Fn(ToolArguments) -> BoxFuture<'static, Result<String>> + Send + Sync;

/// Tool backed by a closure.
///
/// Useful for descriptors that capture session state (a page snapshot, a
/// navigation handle) at the moment the registry is built.
pub struct FnTool {
    schema: ToolSchema,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String> {
        (self.handler)(arguments.clone()).await
    }
}

/// Ordered set of the tools active for one conversation context
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; names must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Resolve and execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.execute(&call.arguments).await
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.schema().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Human-readable tool catalogue for templates that describe tools in prose
pub fn generate_prompt_section(schemas: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
    prompt.push_str("```tool\n{\"name\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

    for schema in schemas {
        prompt.push_str(&format!("### {}\n", schema.name));
        prompt.push_str(&format!("{}\n", schema.description));

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}
