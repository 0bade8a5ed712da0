//! HTTP Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, SessionId, ToolSchema};
use page_tools::{build_registry, PageContext, RecordingNavigator};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub engine_available: bool,
    pub sessions: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub page: Option<PageContext>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::Busy(_) => (StatusCode::CONFLICT, "SESSION_BUSY"),
        AgentError::Config(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        AgentError::EngineUnavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine_available = state.adapter.engine().health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        engine_available,
        sessions: state.sessions.len(),
    })
}

/// Tools available on a page-less context
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Vec<ToolSchema>>, ApiError> {
    let ctx = state.tool_context(PageContext::default(), Arc::new(RecordingNavigator::new()));
    let registry = build_registry(&ctx).map_err(|e| api_error(&e))?;
    Ok(Json(registry.schemas()))
}

/// Main chat endpoint
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(&AgentError::Config("message must not be empty".into())));
    }

    let session_id = payload
        .session_id
        .map_or_else(SessionId::new, SessionId::from_string);
    let session = state
        .sessions
        .get_or_create(&session_id, || state.new_orchestrator())
        .map_err(|e| api_error(&e))?;

    // Tools close over this request's page snapshot
    let navigator = Arc::new(RecordingNavigator::new());
    let ctx = state.tool_context(payload.page.unwrap_or_default(), navigator.clone());
    let tools = build_registry(&ctx).map_err(|e| api_error(&e))?;

    let message = session
        .ask_with_tools(&payload.message, tools)
        .await
        .map_err(|e| {
            if e.is_engine_failure() {
                tracing::error!(session = %session_id, "Agent error: {}", e);
            } else {
                tracing::warn!(session = %session_id, "Request rejected: {}", e);
            }
            api_error(&e)
        })?;

    Ok(Json(ChatResponse {
        message,
        session_id: session_id.to_string(),
        navigated_to: navigator.destination(),
    }))
}

/// Drop a session and its conversation
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&SessionId::from_string(session_id))
        .map_err(|e| api_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}
