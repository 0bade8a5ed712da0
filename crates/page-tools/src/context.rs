//! Ambient Context
//!
//! Snapshot types handed to the registry factory. Tools read the snapshot
//! captured when they were built, never live state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::navigation::Navigator;
use crate::search::SearchCollaborator;

/// Read-only snapshot of the page the user is looking at
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PageContext {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Everything the built-in tools may close over
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Current page snapshot
    pub page: PageContext,

    /// Navigation side effect; `navigate` is only registered when present
    pub navigator: Option<Arc<dyn Navigator>>,

    /// FAQ search; `faq_lookup` is only registered when present
    pub faq: Option<Arc<dyn SearchCollaborator>>,

    /// Known destinations, advertised as the `path` enum and enforced
    pub routes: Vec<String>,
}

impl ToolContext {
    pub fn new(page: PageContext) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_faq(mut self, faq: Arc<dyn SearchCollaborator>) -> Self {
        self.faq = Some(faq);
        self
    }

    pub fn with_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes = routes.into_iter().map(Into::into).collect();
        self
    }
}
