//! FAQ Lookup Tool
//!
//! Answers common questions from the configured search collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolArguments, ToolSchema};

use crate::error::ToolkitError;
use crate::search::SearchCollaborator;

const DEFAULT_LIMIT: usize = 3;
const MAX_LIMIT: usize = 10;

/// Tool for searching the FAQ
pub struct FaqLookupTool {
    search: Arc<dyn SearchCollaborator>,
}

impl FaqLookupTool {
    pub fn new(search: Arc<dyn SearchCollaborator>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for FaqLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "faq_lookup".into(),
            description: "Search the frequently asked questions for entries related to the user's question.".into(),
            parameters: vec![
                ParameterSchema::new("query", "string", "The user's question, in their words").required(),
                ParameterSchema::new("limit", "integer", "Maximum number of entries to return")
                    .with_default(json!(DEFAULT_LIMIT)),
            ],
            category: Some("knowledge".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<String> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolkitError::MissingArgument("query".into()))?;

        // Models sometimes send numbers as strings
        let limit = match arguments.get("limit") {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

        let hits = self.search.find(query, limit).await?;
        tracing::debug!(backend = self.search.name(), hits = hits.len(), "FAQ lookup");

        if hits.is_empty() {
            return Ok(format!("No FAQ entries match \"{}\".", query));
        }

        let mut output = String::from("Relevant FAQ entries:\n");
        for (i, hit) in hits.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, hit));
        }
        Ok(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{FaqEntry, MemoryFaqIndex};

    fn tool() -> FaqLookupTool {
        FaqLookupTool::new(Arc::new(MemoryFaqIndex::new(vec![
            FaqEntry::new("How do refunds work?", "Refunds are issued within 14 days."),
            FaqEntry::new("Do you offer refunds on annual plans?", "Annual plans are refundable pro rata."),
        ])))
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_numbered_hits() {
        let out = tool()
            .execute(&args(json!({"query": "refunds", "limit": "1"})))
            .await
            .unwrap();
        assert!(out.starts_with("Relevant FAQ entries:\n1. Q: "));
        assert!(!out.contains("2. "));
    }

    #[tokio::test]
    async fn test_no_hits() {
        let out = tool().execute(&args(json!({"query": "shipping"}))).await.unwrap();
        assert_eq!(out, "No FAQ entries match \"shipping\".");
    }

    #[tokio::test]
    async fn test_query_required() {
        assert!(tool().execute(&args(json!({"limit": 2}))).await.is_err());
    }
}
