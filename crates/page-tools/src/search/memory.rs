//! In-memory FAQ index
//!
//! Term-overlap scoring over a small, static FAQ. Good enough for demos and
//! tests; production deployments plug in a real similarity search.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SearchCollaborator;
use crate::error::Result;

/// One FAQ entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    fn snippet(&self) -> String {
        format!("Q: {}\nA: {}", self.question, self.answer)
    }
}

/// FAQ index held in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryFaqIndex {
    entries: Vec<FaqEntry>,
}

impl MemoryFaqIndex {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of `{question, answer}` objects
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a JSON FAQ file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn score(&self, entry: &FaqEntry, query: &HashSet<String>) -> usize {
        let question = terms(&entry.question);
        let answer = terms(&entry.answer);
        query
            .iter()
            .map(|t| 2 * usize::from(question.contains(t)) + usize::from(answer.contains(t)))
            .sum()
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "in", "is", "it", "my",
    "of", "on", "or", "the", "to", "what", "with", "you",
];

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[async_trait]
impl SearchCollaborator for MemoryFaqIndex {
    async fn find(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let query = terms(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &FaqEntry)> = self
            .entries
            .iter()
            .map(|e| (self.score(e, &query), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable: equal scores keep file order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.snippet())
            .collect())
    }

    fn name(&self) -> &str {
        "MemoryFaqIndex"
    }
}
