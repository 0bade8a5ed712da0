//! Chat Templates
//!
//! Renders turns plus tool descriptors into the raw prompt a model was
//! trained on, ending with the assistant generation prompt.

use std::str::FromStr;

use agent_core::{
    message::{Message, Role},
    tool::{generate_prompt_section, ToolSchema},
    AgentError, Result,
};

/// Prompt dialect of the served model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatTemplate {
    /// `<|im_start|>role ... <|im_end|>` (Qwen, Hermes, SmolLM)
    #[default]
    ChatMl,
    /// `<|start_of_role|>role<|end_of_role|> ... <|end_of_text|>` (IBM Granite 3)
    Granite,
    /// Markdown headers with a prose tool catalogue, for base models
    Plain,
}

impl FromStr for ChatTemplate {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chatml" => Ok(Self::ChatMl),
            "granite" => Ok(Self::Granite),
            "plain" => Ok(Self::Plain),
            other => Err(AgentError::Config(format!("unknown chat template: {}", other))),
        }
    }
}

impl ChatTemplate {
    /// Dialect an Ollama model tag was trained on, guessed from its family name
    pub fn for_model(model: &str) -> Self {
        let family = model.rsplit('/').next().unwrap_or(model).to_lowercase();
        if family.starts_with("granite") {
            Self::Granite
        } else {
            Self::ChatMl
        }
    }

    /// End-of-turn marker that may leak into decoded output
    pub fn eos_marker(self) -> Option<&'static str> {
        match self {
            Self::ChatMl => Some("<|im_end|>"),
            Self::Granite => Some("<|end_of_text|>"),
            Self::Plain => None,
        }
    }

    /// Render turns and tools, appending the generation prompt
    pub fn render(self, turns: &[Message], tools: &[ToolSchema]) -> Result<String> {
        match self {
            Self::ChatMl => render_chatml(turns, tools),
            Self::Granite => render_granite(turns, tools),
            Self::Plain => Ok(render_plain(turns, tools)),
        }
    }
}

fn tool_lines(tools: &[ToolSchema]) -> Result<Vec<String>> {
    tools
        .iter()
        .map(|t| serde_json::to_string(&t.to_json_schema()).map_err(AgentError::from))
        .collect()
}

fn render_chatml(turns: &[Message], tools: &[ToolSchema]) -> Result<String> {
    let (system, rest) = split_system(turns);
    let mut out = String::new();

    if system.is_some() || !tools.is_empty() {
        out.push_str("<|im_start|>system\n");
        if let Some(system) = system {
            out.push_str(&system.content);
        }
        if !tools.is_empty() {
            out.push_str("\n\n# Tools\n\nYou may call one or more functions to assist with the user query.\n\n");
            out.push_str("You are provided with function signatures within <tools></tools> XML tags:\n<tools>\n");
            for line in tool_lines(tools)? {
                out.push_str(&line);
                out.push('\n');
            }
            out.push_str("</tools>\n\nFor each function call, return a json object with function name and arguments within <tool_call></tool_call> XML tags:\n");
            out.push_str("<tool_call>\n{\"name\": <function-name>, \"arguments\": <args-json-object>}\n</tool_call>");
        }
        out.push_str("<|im_end|>\n");
    }

    for turn in rest {
        match turn.role {
            Role::Tool => {
                out.push_str("<|im_start|>user\n<tool_response>\n");
                out.push_str(&turn.content);
                out.push_str("\n</tool_response><|im_end|>\n");
            }
            role => {
                out.push_str(&format!("<|im_start|>{}\n{}<|im_end|>\n", role, turn.content));
            }
        }
    }

    out.push_str("<|im_start|>assistant\n");
    Ok(out)
}

fn render_granite(turns: &[Message], tools: &[ToolSchema]) -> Result<String> {
    let (system, rest) = split_system(turns);
    let mut out = String::new();

    if let Some(system) = system {
        out.push_str(&format!(
            "<|start_of_role|>system<|end_of_role|>{}<|end_of_text|>\n",
            system.content
        ));
    }

    if !tools.is_empty() {
        out.push_str("<|start_of_role|>available_tools<|end_of_role|>\n");
        out.push_str(&tool_lines(tools)?.join("\n\n"));
        out.push_str("<|end_of_text|>\n");
    }

    for turn in rest {
        let role = match turn.role {
            Role::Tool => "tool_response".to_string(),
            role => role.to_string(),
        };
        out.push_str(&format!(
            "<|start_of_role|>{}<|end_of_role|>{}<|end_of_text|>\n",
            role, turn.content
        ));
    }

    out.push_str("<|start_of_role|>assistant<|end_of_role|>");
    Ok(out)
}

fn render_plain(turns: &[Message], tools: &[ToolSchema]) -> String {
    let mut out = String::new();

    for turn in turns {
        out.push_str(&format!("### {}:\n{}\n", heading(turn.role), turn.content));
        if turn.role == Role::System && !tools.is_empty() {
            out.push('\n');
            out.push_str(&generate_prompt_section(tools));
        }
        out.push('\n');
    }

    out.push_str("### Assistant:\n");
    out
}

fn heading(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::Tool => "Tool Result",
    }
}

fn split_system(turns: &[Message]) -> (Option<&Message>, &[Message]) {
    match turns.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, turns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ParameterSchema;

    fn turns() -> Vec<Message> {
        vec![
            Message::system("Be brief."),
            Message::user("What page is this?"),
            Message::assistant("<tool_call>{\"name\": \"get_page_context\"}</tool_call>"),
            Message::tool("Current Page: Pricing"),
        ]
    }

    fn tools() -> Vec<ToolSchema> {
        vec![ToolSchema::new("get_page_context", "Get the current page")
            .parameter(ParameterSchema::new("verbose", "boolean", "More detail"))]
    }

    #[test]
    fn test_chatml_render() {
        let prompt = ChatTemplate::ChatMl.render(&turns(), &tools()).unwrap();

        assert!(prompt.starts_with("<|im_start|>system\nBe brief."));
        assert!(prompt.contains("\"name\":\"get_page_context\""));
        assert!(prompt.contains("<tool_response>\nCurrent Page: Pricing\n</tool_response>"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
        assert_eq!(prompt.matches("<|im_start|>system").count(), 1);
    }

    #[test]
    fn test_granite_render() {
        let prompt = ChatTemplate::Granite.render(&turns(), &tools()).unwrap();

        assert!(prompt.contains("<|start_of_role|>available_tools<|end_of_role|>"));
        assert!(prompt.contains("<|start_of_role|>tool_response<|end_of_role|>Current Page: Pricing"));
        assert!(prompt.ends_with("<|start_of_role|>assistant<|end_of_role|>"));
    }

    #[test]
    fn test_plain_render_lists_tools() {
        let prompt = ChatTemplate::Plain.render(&turns(), &tools()).unwrap();
        assert!(prompt.contains("## Available Tools"));
        assert!(prompt.contains("### get_page_context"));
        assert!(prompt.ends_with("### Assistant:\n"));
    }

    #[test]
    fn test_no_tools_no_tool_section() {
        let prompt = ChatTemplate::ChatMl
            .render(&[Message::user("hi")], &[])
            .unwrap();
        assert_eq!(prompt, "<|im_start|>user\nhi<|im_end|>\n<|im_start|>assistant\n");
    }

    #[test]
    fn test_template_follows_model_family() {
        assert_eq!(ChatTemplate::for_model("granite3.1-dense:2b"), ChatTemplate::Granite);
        assert_eq!(ChatTemplate::for_model("ibm/granite3.3:8b"), ChatTemplate::Granite);
        assert_eq!(ChatTemplate::for_model("qwen2.5:3b"), ChatTemplate::ChatMl);
    }

    #[test]
    fn test_default_model_gets_its_own_template() {
        let model = agent_core::GenerationOptions::default().model;
        assert_eq!(ChatTemplate::for_model(&model), ChatTemplate::Granite);
    }

    #[test]
    fn test_template_from_str() {
        assert_eq!("Granite".parse::<ChatTemplate>().unwrap(), ChatTemplate::Granite);
        assert!("llama".parse::<ChatTemplate>().is_err());
    }
}
