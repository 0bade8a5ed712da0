//! Search Integration
//!
//! Abstraction over the similarity-search service backing FAQ lookups.

mod memory;

pub use memory::{FaqEntry, MemoryFaqIndex};

use async_trait::async_trait;

use crate::error::Result;

/// Search collaborator trait (Strategy pattern)
///
/// Implement this for each backend: a vector store, a hosted search API, ...
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    /// Top `limit` snippets most similar to `query`, best first
    async fn find(&self, query: &str, limit: usize) -> Result<Vec<String>>;

    /// Backend name
    fn name(&self) -> &str;
}
