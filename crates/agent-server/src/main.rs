//! Page assistant HTTP server
//!
//! Axum-based server exposing the tool-augmented chat loop over a REST API.
//! Every request carries the page the user is on; the session's tools are
//! rebuilt from that snapshot before the model runs.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{ModelAdapter, OrchestratorConfig, SessionStore};
use agent_runtime::OllamaEngine;
use page_tools::{MemoryFaqIndex, SearchCollaborator, PAGE_ASSISTANT_PROMPT};

use crate::handlers::{chat_handler, delete_session, health_check, list_tools};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let mut config = OrchestratorConfig::from_env()?;
    if std::env::var("AGENT_SYSTEM_PROMPT").is_err() {
        config.system_prompt = PAGE_ASSISTANT_PROMPT.into();
    }

    // One adapter for all sessions so the model is acquired once
    let engine = Arc::new(OllamaEngine::from_env()?);
    let adapter = Arc::new(ModelAdapter::new(engine, config.generation.clone()));

    match adapter.warm_up().await {
        Ok(()) => tracing::info!("✓ Model {} loaded", config.generation.model),
        Err(e) => {
            tracing::warn!("⚠ Model not available yet: {}", e);
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let faq: Option<Arc<dyn SearchCollaborator>> = match std::env::var("FAQ_PATH") {
        Ok(path) => {
            let index = MemoryFaqIndex::load(&path).await?;
            tracing::info!("✓ Loaded {} FAQ entries from {}", index.len(), path);
            Some(Arc::new(index))
        }
        Err(_) => {
            tracing::warn!("⚠ FAQ_PATH not set - faq_lookup disabled");
            None
        }
    };

    let routes: Vec<String> = std::env::var("SITE_ROUTES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let state = AppState {
        adapter,
        config: Arc::new(config),
        sessions: Arc::new(SessionStore::new()),
        faq,
        routes: Arc::new(routes),
    };

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Page assistant running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                - Health check");
    tracing::info!("  GET    /api/tools             - List tools");
    tracing::info!("  POST   /api/chat              - Send message");
    tracing::info!("  DELETE /api/chat/{{session_id}} - End session");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Build the router
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/{session_id}", delete(delete_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
