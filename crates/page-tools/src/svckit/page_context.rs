//! Page Context Tool
//!
//! Reports the page the user was on when the tool set was built.

use async_trait::async_trait;

use agent_core::{Result as CoreResult, Tool, ToolArguments, ToolSchema};

use crate::context::PageContext;

/// Tool exposing the current page snapshot to the model
pub struct PageContextTool {
    page: PageContext,
}

impl PageContextTool {
    pub fn new(page: PageContext) -> Self {
        Self { page }
    }
}

#[async_trait]
impl Tool for PageContextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_page_context".into(),
            description: "Get the current page context. Often the user navigates through the page so use this tool each time the user requests information about the current page or item".into(),
            parameters: Vec::new(),
            category: Some("context".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, _arguments: &ToolArguments) -> CoreResult<String> {
        let mut output = format!("Current Page: {}\n{}", self.page.title, self.page.content.trim());
        if let Some(url) = &self.page.url {
            output.push_str(&format!("\nURL: {}", url));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_snapshot() {
        let tool = PageContextTool::new(PageContext::new("Pricing", "  Three plans: Free, Pro, Team.\n"));
        let out = tool.execute(&ToolArguments::new()).await.unwrap();
        assert_eq!(out, "Current Page: Pricing\nThree plans: Free, Pro, Team.");
        assert!(tool.schema().parameters.is_empty());
    }

    #[tokio::test]
    async fn test_includes_url() {
        let page = PageContext::new("Blog", "Posts").with_url("/blog");
        let out = PageContextTool::new(page).execute(&ToolArguments::new()).await.unwrap();
        assert!(out.ends_with("URL: /blog"));
    }
}
