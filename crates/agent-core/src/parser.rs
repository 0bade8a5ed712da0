//! Tool-Call Parser
//!
//! Splits raw assistant text into the prose meant for the user and the tool
//! calls embedded in it.
//!
//! ## Grammar (version 2)
//!
//! ```text
//! response   := ( text | block )*
//! block      := "```tool" ws payload "```"
//!             | "```tool_call" ws payload "```"
//!             | "<tool_call>" payload "</tool_call>"
//!             | "<|tool_call|>" payload ( "<|end_of_text|>" | end )
//! payload    := call | "[" call ("," call)* "]"
//! call       := { "name" | "tool": string, ("arguments" | "parameters"): object | string }
//! ```
//!
//! `<|tool_call|>` is the Granite native form; it has no closing tag and runs
//! to the end of the reply. A closing delimiter that falls inside a JSON
//! string does not end the block: later closers are tried until the payload
//! decodes. A block whose payload does not decode is dropped along with its
//! text. An opening delimiter with no closing one swallows the rest of the
//! response (the generation was truncated mid-call).

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::tool::{ToolArguments, ToolCall};

/// Version of the embedded block grammar the parser accepts
pub const GRAMMAR_VERSION: u32 = 2;

/// Opening/closing pair for one block syntax
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiter {
    pub open: &'static str,
    /// `None` runs the block to [`OPEN_BLOCK_END`] or the end of the reply
    pub close: Option<&'static str>,
    /// Opener must be followed by whitespace (fence info strings)
    pub fenced: bool,
}

/// Recognized block syntaxes; longer openers first so `tool_call` wins over `tool`
pub const DELIMITERS: &[Delimiter] = &[
    Delimiter { open: "```tool_call", close: Some("```"), fenced: true },
    Delimiter { open: "```tool", close: Some("```"), fenced: true },
    Delimiter { open: "<tool_call>", close: Some("</tool_call>"), fenced: false },
    Delimiter { open: "<|tool_call|>", close: None, fenced: false },
];

/// End-of-sequence text that terminates an unclosed block early
pub const OPEN_BLOCK_END: &str = "<|end_of_text|>";

/// One scanned piece of a response
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Text(String),
    ToolCall(ToolCall),
}

/// Parsed assistant response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedResponse {
    /// Non-tool text, in order, trimmed
    pub message: String,
    /// Decoded tool calls, in order of appearance
    pub tool_calls: Vec<ToolCall>,
}

impl ParsedResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Parse a raw response into message and tool calls
pub fn parse(content: &str) -> ParsedResponse {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for fragment in parse_fragments(content) {
        match fragment {
            Fragment::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    texts.push(trimmed.to_string());
                }
            }
            Fragment::ToolCall(call) => tool_calls.push(call),
        }
    }

    ParsedResponse {
        message: texts.join("\n\n"),
        tool_calls,
    }
}

/// Scan a response into text and tool-call fragments
pub fn parse_fragments(content: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = content;

    while let Some((start, delim)) = find_opener(rest) {
        if start > 0 {
            fragments.push(Fragment::Text(rest[..start].to_string()));
        }

        let tail = &rest[start + delim.open.len()..];
        let Some((decoded, consumed)) = scan_block(tail, delim) else {
            tracing::warn!(opener = delim.open, "Dropping unterminated tool call block");
            return fragments;
        };

        match decoded {
            Ok(calls) => fragments.extend(calls.into_iter().map(Fragment::ToolCall)),
            Err(e) => tracing::warn!(error = %e, "Dropping malformed tool call block"),
        }

        rest = &tail[consumed..];
    }

    if !rest.is_empty() {
        fragments.push(Fragment::Text(rest.to_string()));
    }

    fragments
}

/// Decode the block at the head of `tail` (opener already consumed).
///
/// Returns the decode outcome and the bytes the block spans, closer included,
/// or `None` when a required closer never appears.
fn scan_block(tail: &str, delim: Delimiter) -> Option<(Result<Vec<ToolCall>>, usize)> {
    let Some(close) = delim.close else {
        return Some(match tail.find(OPEN_BLOCK_END) {
            Some(end) => (decode_block(&tail[..end]), end + OPEN_BLOCK_END.len()),
            None => (decode_block(tail), tail.len()),
        });
    };

    let ends: Vec<usize> = tail.match_indices(close).map(|(pos, _)| pos).collect();
    let first = *ends.first()?;

    // A closer inside a JSON string cuts the payload short; take the first that decodes
    let decoded = ends
        .iter()
        .find_map(|&end| decode_block(&tail[..end]).ok().map(|calls| (Ok(calls), end + close.len())));

    Some(decoded.unwrap_or_else(|| (decode_block(&tail[..first]), first + close.len())))
}

/// Earliest block opener in `text`
fn find_opener(text: &str) -> Option<(usize, Delimiter)> {
    DELIMITERS
        .iter()
        .filter_map(|delim| find_delimiter(text, delim).map(|pos| (pos, *delim)))
        // DELIMITERS order breaks ties, min_by_key keeps the first minimum
        .min_by_key(|(pos, _)| *pos)
}

fn find_delimiter(text: &str, delim: &Delimiter) -> Option<usize> {
    text.match_indices(delim.open).map(|(pos, _)| pos).find(|&pos| {
        if !delim.fenced {
            return true;
        }
        text[pos + delim.open.len()..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
    })
}

/// Decode a block payload into one or more calls
fn decode_block(body: &str) -> Result<Vec<ToolCall>> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|e| AgentError::Parse(format!("invalid JSON in tool call block: {}", e)))?;

    match value {
        Value::Object(_) => Ok(vec![decode_call(value)?]),
        Value::Array(items) => {
            let calls: Vec<ToolCall> = items
                .into_iter()
                .filter_map(|item| match decode_call(item) {
                    Ok(call) => Some(call),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed entry in tool call list");
                        None
                    }
                })
                .collect();
            if calls.is_empty() {
                Err(AgentError::Parse("tool call list has no valid entries".into()))
            } else {
                Ok(calls)
            }
        }
        other => Err(AgentError::Parse(format!(
            "tool call block must be an object or array, got {}",
            other
        ))),
    }
}

fn decode_call(value: Value) -> Result<ToolCall> {
    let Value::Object(mut map) = value else {
        return Err(AgentError::Parse("tool call must be a JSON object".into()));
    };

    let name = map
        .remove("name")
        .or_else(|| map.remove("tool"))
        .and_then(|v| v.as_str().map(str::trim).map(String::from))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AgentError::Parse("tool call is missing a name".into()))?;

    let arguments = match map.remove("arguments").or_else(|| map.remove("parameters")) {
        None | Some(Value::Null) => ToolArguments::new(),
        Some(Value::Object(args)) => args,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(args)) => args,
            _ => {
                return Err(AgentError::Parse(format!(
                    "arguments for '{}' are not a JSON object",
                    name
                )));
            }
        },
        Some(_) => {
            return Err(AgentError::Parse(format!(
                "arguments for '{}' are not a JSON object",
                name
            )));
        }
    };

    let mut call = ToolCall::new(name, arguments);
    call.id = Some(uuid::Uuid::new_v4().to_string());
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_untouched() {
        let parsed = parse("  The page is about pricing.\n");
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, "The page is about pricing.");
    }

    #[test]
    fn test_fenced_call_with_prose() {
        let content = r#"Let me check that for you.
```tool
{"name": "get_page_context", "arguments": {}}
```"#;
        let parsed = parse(content);
        assert_eq!(parsed.message, "Let me check that for you.");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].name, "get_page_context");
        assert!(parsed.tool_calls[0].id.is_some());
    }

    #[test]
    fn test_tagged_calls_keep_order() {
        let content = "First.<tool_call>{\"name\": \"a\"}</tool_call> Middle. \
                       <tool_call>{\"tool\": \"b\", \"parameters\": {\"q\": 1}}</tool_call>Last.";
        let parsed = parse(content);
        let names: Vec<_> = parsed.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parsed.tool_calls[1].arguments["q"], json!(1));
        assert_eq!(parsed.message, "First.\n\nMiddle.\n\nLast.");
    }

    #[test]
    fn test_array_payload() {
        let content = r#"<tool_call>[{"name": "a", "arguments": {}}, {"name": "b", "arguments": "{\"x\": true}"}]</tool_call>"#;
        let parsed = parse(content);
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.tool_calls[1].arguments["x"], json!(true));
        assert!(parsed.message.is_empty());
    }

    #[test]
    fn test_malformed_block_is_dropped() {
        let content = "Before.\n```tool\n{\"name\": \"a\", \"arguments\": \n```\nAfter.";
        let parsed = parse(content);
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, "Before.\n\nAfter.");
    }

    #[test]
    fn test_block_without_name_is_dropped() {
        let parsed = parse(r#"<tool_call>{"arguments": {"q": "x"}}</tool_call>ok"#);
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, "ok");
    }

    #[test]
    fn test_non_object_arguments_dropped() {
        let parsed = parse(r#"<tool_call>{"name": "a", "arguments": [1, 2]}</tool_call>"#);
        assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn test_unterminated_block_swallows_rest() {
        let parsed = parse("Sure.\n<tool_call>{\"name\": \"a\", \"argum");
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, "Sure.");
    }

    #[test]
    fn test_other_fences_are_text() {
        let content = "```toolbox\nnot a call\n```\n```json\n{\"name\": \"a\"}\n```";
        let parsed = parse(content);
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, content.trim());
    }

    #[test]
    fn test_granite_native_call() {
        let parsed = parse(r#"<|tool_call|>[{"name": "get_page_context", "arguments": {}}]"#);
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].name, "get_page_context");
        assert!(parsed.message.is_empty());
    }

    #[test]
    fn test_granite_call_stops_at_end_of_text() {
        let content = "Checking.<|tool_call|>[{\"name\": \"a\"}, {\"name\": \"b\"}]<|end_of_text|>";
        let parsed = parse(content);
        let names: Vec<_> = parsed.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parsed.message, "Checking.");
    }

    #[test]
    fn test_granite_malformed_call_is_dropped() {
        let parsed = parse("Sure.<|tool_call|>[{\"name\": ");
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.message, "Sure.");
    }

    #[test]
    fn test_fence_inside_json_string() {
        let content = "```tool\n{\"name\": \"faq_lookup\", \"arguments\": {\"query\": \"what is ``` in markdown\"}}\n```\nDone.";
        let parsed = parse(content);
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].arguments["query"], json!("what is ``` in markdown"));
        assert_eq!(parsed.message, "Done.");
    }

    #[test]
    fn test_grammar_version() {
        assert_eq!(GRAMMAR_VERSION, 2);
        assert!(DELIMITERS.iter().any(|d| d.open == "<|tool_call|>" && d.close.is_none()));
    }

    #[test]
    fn test_fragments_are_tagged() {
        let fragments = parse_fragments("hi <tool_call>{\"name\": \"a\"}</tool_call>");
        assert_eq!(fragments.len(), 2);
        assert!(matches!(&fragments[0], Fragment::Text(t) if t == "hi "));
        assert!(matches!(&fragments[1], Fragment::ToolCall(c) if c.name == "a"));
    }
}
