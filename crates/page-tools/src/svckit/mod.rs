//! Service Kit - Agent Tools
//!
//! Built-in tools implementing `agent_core::Tool` for the page assistant.

mod faq_lookup;
mod navigate;
mod page_context;

pub use faq_lookup::FaqLookupTool;
pub use navigate::NavigateTool;
pub use page_context::PageContextTool;
