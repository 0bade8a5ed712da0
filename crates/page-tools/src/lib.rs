//! # page-tools
//!
//! Built-in tools for a website assistant:
//!
//! - `get_page_context`: what the user is looking at
//! - `navigate`: send the user to another page
//! - `faq_lookup`: search the frequently asked questions
//!
//! Tools close over a [`ToolContext`] snapshot. Build a fresh registry with
//! [`build_registry`] whenever the page changes and hand it to the session.

pub mod context;
pub mod error;
pub mod navigation;
pub mod search;
pub mod svckit;

pub use context::{PageContext, ToolContext};
pub use error::{Result, ToolkitError};
pub use navigation::{Navigator, RecordingNavigator};
pub use search::{FaqEntry, MemoryFaqIndex, SearchCollaborator};

/// Re-export tools for convenience
pub mod tools {
    pub use crate::svckit::{FaqLookupTool, NavigateTool, PageContextTool};
}

use agent_core::ToolRegistry;

/// System prompt for the page assistant
pub const PAGE_ASSISTANT_PROMPT: &str = r#"You are a helpful assistant embedded in a website. Answer questions about the site and the page the user is reading.

When you need information about the current page, call get_page_context. When the user wants to go somewhere, call navigate with the destination path. For common questions, call faq_lookup first.

To call a tool, respond with a block in this exact format:
<tool_call>
{"name": "tool_name", "arguments": {"arg1": "value1"}}
</tool_call>

You may request several tools at once with one block per call. After receiving tool results, answer the user using them.

Keep answers short and friendly. Never invent page content you have not been given."#;

/// Build the tool registry for one page snapshot.
///
/// `get_page_context` is always present. `navigate` and `faq_lookup` are only
/// registered when the context carries their collaborator.
pub fn build_registry(ctx: &ToolContext) -> agent_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(tools::PageContextTool::new(ctx.page.clone()))?;

    if let Some(navigator) = &ctx.navigator {
        registry.register(tools::NavigateTool::new(navigator.clone(), ctx.routes.clone()))?;
    }

    if let Some(faq) = &ctx.faq {
        registry.register(tools::FaqLookupTool::new(faq.clone()))?;
    }

    tracing::debug!(tools = ?registry.names(), page = %ctx.page.title, "Built page tool registry");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_prompt_shows_call_format() {
        assert!(PAGE_ASSISTANT_PROMPT.contains("<tool_call>\n{\"name\": \"tool_name\""));
        assert!(PAGE_ASSISTANT_PROMPT.ends_with("you have not been given."));
    }

    #[test]
    fn test_minimal_registry() {
        let registry = build_registry(&ToolContext::new(PageContext::new("Home", "Welcome"))).unwrap();
        assert_eq!(registry.names(), vec!["get_page_context"]);
    }

    #[test]
    fn test_full_registry() {
        let ctx = ToolContext::new(PageContext::new("Home", "Welcome"))
            .with_navigator(Arc::new(RecordingNavigator::new()))
            .with_faq(Arc::new(MemoryFaqIndex::new(Vec::new())))
            .with_routes(["/", "/pricing"]);

        let registry = build_registry(&ctx).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.get("navigate").is_some());
        assert!(registry.get("faq_lookup").is_some());
    }

    #[tokio::test]
    async fn test_registry_reads_snapshot() {
        let registry = build_registry(&ToolContext::new(PageContext::new("Docs", "API reference"))).unwrap();
        let out = registry
            .execute(&agent_core::ToolCall::new("get_page_context", agent_core::ToolArguments::new()))
            .await
            .unwrap();
        assert_eq!(out, "Current Page: Docs\nAPI reference");
    }
}
