//! Application State

use std::sync::Arc;

use agent_core::{ModelAdapter, Orchestrator, OrchestratorConfig, SessionStore, ToolRegistry};
use page_tools::{PageContext, RecordingNavigator, SearchCollaborator, ToolContext};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Model adapter shared by every session; the model is acquired once
    pub adapter: Arc<ModelAdapter>,

    /// Template for new sessions
    pub config: Arc<OrchestratorConfig>,

    /// Live chat sessions
    pub sessions: Arc<SessionStore>,

    /// FAQ search (optional - `faq_lookup` is disabled without it)
    pub faq: Option<Arc<dyn SearchCollaborator>>,

    /// Known site routes for `navigate`; empty allows any path
    pub routes: Arc<Vec<String>>,
}

impl AppState {
    /// Fresh orchestrator for a new session
    pub fn new_orchestrator(&self) -> agent_core::Result<Orchestrator> {
        Ok(Orchestrator::new(
            self.adapter.clone(),
            Arc::new(ToolRegistry::new()),
            (*self.config).clone(),
        ))
    }

    /// Tool context for one request, wired to the given navigator
    pub fn tool_context(&self, page: PageContext, navigator: Arc<RecordingNavigator>) -> ToolContext {
        let mut ctx = ToolContext::new(page)
            .with_navigator(navigator)
            .with_routes(self.routes.iter().cloned());
        if let Some(faq) = &self.faq {
            ctx = ctx.with_faq(faq.clone());
        }
        ctx
    }
}
