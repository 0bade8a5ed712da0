//! Session Management
//!
//! Live chat sessions, one orchestrator each. Sessions are kept in memory for
//! the lifetime of the process only; idle ones expire and the store is capped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::orchestrator::Orchestrator;
use crate::tool::ToolRegistry;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live chat session
pub struct ChatSession {
    /// Unique identifier
    pub id: SessionId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    last_used: StdMutex<Instant>,
    orchestrator: Mutex<Orchestrator>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(id: SessionId, orchestrator: Orchestrator) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            last_used: StdMutex::new(Instant::now()),
            orchestrator: Mutex::new(orchestrator),
        }
    }

    /// Ask a question; rejected with [`AgentError::Busy`] while another round
    /// of this session is in flight
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut orchestrator = self.lock()?;
        orchestrator.ask(question).await
    }

    /// Rebuild the tool set from fresh context, then ask
    pub async fn ask_with_tools(&self, question: &str, tools: ToolRegistry) -> Result<String> {
        let mut orchestrator = self.lock()?;
        orchestrator.set_tools(Arc::new(tools));
        orchestrator.ask(question).await
    }

    /// Clear the conversation
    pub fn reset(&self) -> Result<()> {
        self.lock()?.reset();
        Ok(())
    }

    /// Number of turns so far, `None` while a round is running
    pub fn turn_count(&self) -> Option<usize> {
        self.orchestrator
            .try_lock()
            .ok()
            .map(|o| o.conversation().len())
    }

    /// Time since the session was created or last asked
    pub fn idle_for(&self) -> Duration {
        let at = *self.last_used.lock().unwrap_or_else(PoisonError::into_inner);
        at.elapsed()
    }

    /// Whether a round is in flight
    pub fn is_busy(&self) -> bool {
        self.orchestrator.try_lock().is_err()
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn lock(&self) -> Result<tokio::sync::MutexGuard<'_, Orchestrator>> {
        let guard = self
            .orchestrator
            .try_lock()
            .map_err(|_| AgentError::Busy(self.id.to_string()))?;
        self.touch();
        Ok(guard)
    }
}

/// Idle time after which a session is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Maximum number of live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// In-memory store of live sessions.
///
/// Expired sessions are swept whenever a new one is created. At capacity the
/// least recently used idle session is evicted; busy sessions are never
/// evicted.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<ChatSession>>>,
    idle_timeout: Option<Duration>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: RwLock::default(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop sessions idle for longer than `timeout`; `None` keeps them forever
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Cap the number of live sessions (at least one)
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    /// Look up a session, creating it with `make` when absent
    pub fn get_or_create<F>(&self, id: &SessionId, make: F) -> Result<Arc<ChatSession>>
    where
        F: FnOnce() -> Result<Orchestrator>,
    {
        if let Some(session) = self.get(id) {
            return Ok(session);
        }

        let mut sessions = self.write()?;
        if let Some(session) = sessions.get(id) {
            return Ok(Arc::clone(session));
        }

        self.sweep(&mut sessions);
        if sessions.len() >= self.max_sessions && !evict_least_recent(&mut sessions) {
            return Err(AgentError::Busy(format!(
                "all {} sessions are busy",
                self.max_sessions
            )));
        }

        let session = Arc::new(ChatSession::new(id.clone(), make()?));
        sessions.insert(id.clone(), Arc::clone(&session));
        tracing::info!(session = %id, "Session created");
        Ok(session)
    }

    /// Load a session by ID
    pub fn get(&self, id: &SessionId) -> Option<Arc<ChatSession>> {
        self.sessions.read().ok()?.get(id).cloned()
    }

    /// Drop a session
    pub fn remove(&self, id: &SessionId) -> Result<bool> {
        let removed = self.write()?.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Session removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, sessions: &mut HashMap<SessionId, Arc<ChatSession>>) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };
        let before = sessions.len();
        sessions.retain(|_, s| s.is_busy() || s.idle_for() < timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, "Expired idle sessions");
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<SessionId, Arc<ChatSession>>>> {
        self.sessions
            .write()
            .map_err(|_| AgentError::Other("session store lock poisoned".into()))
    }
}

/// Remove the idle session unused for longest; false when every session is busy
fn evict_least_recent(sessions: &mut HashMap<SessionId, Arc<ChatSession>>) -> bool {
    let victim = sessions
        .iter()
        .filter(|(_, s)| !s.is_busy())
        .max_by_key(|(_, s)| s.idle_for())
        .map(|(id, _)| id.clone());

    match victim {
        Some(id) => {
            sessions.remove(&id);
            tracing::info!(session = %id, "Evicted least recently used session");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorBuilder;
    use crate::testing::ScriptedEngine;
    use crate::tool::{FnTool, ToolSchema};
    use std::time::Duration;

    fn orchestrator(engine: ScriptedEngine) -> Result<Orchestrator> {
        OrchestratorBuilder::new().engine(Arc::new(engine)).build()
    }

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[tokio::test]
    async fn test_store_reuses_sessions() {
        let store = SessionStore::new();
        let id = SessionId::new();

        let a = store.get_or_create(&id, || orchestrator(ScriptedEngine::new(["hi"]))).unwrap();
        let b = store
            .get_or_create(&id, || panic!("session should already exist"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);

        assert_eq!(a.ask("hello").await.unwrap(), "hi");
        assert_eq!(b.turn_count(), Some(3));

        assert!(store.remove(&id).unwrap());
        assert!(store.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new().with_idle_timeout(Some(Duration::from_secs(60)));
        let stale = SessionId::from_string("stale");
        let active = SessionId::from_string("active");

        store.get_or_create(&stale, || orchestrator(ScriptedEngine::new(["a"]))).unwrap();
        let session = store.get_or_create(&active, || orchestrator(ScriptedEngine::new(["b"]))).unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        session.ask("still here").await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        store
            .get_or_create(&SessionId::from_string("fresh"), || orchestrator(ScriptedEngine::new(["c"])))
            .unwrap();

        assert!(store.get(&stale).is_none());
        assert!(store.get(&active).is_some());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_is_capped() {
        let store = SessionStore::new().with_max_sessions(3);

        for i in 0..50 {
            store
                .get_or_create(&SessionId::from_string(format!("s{}", i)), || {
                    orchestrator(ScriptedEngine::new(["hi"]))
                })
                .unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        assert_eq!(store.len(), 3);
        assert!(store.get(&SessionId::from_string("s49")).is_some());
        assert!(store.get(&SessionId::from_string("s46")).is_none());
    }

    #[tokio::test]
    async fn test_busy_sessions_are_not_evicted() {
        let store = SessionStore::new().with_max_sessions(1);
        let id = SessionId::from_string("busy");
        let session = store.get_or_create(&id, || orchestrator(ScriptedEngine::new(["hi"]))).unwrap();

        let _guard = session.lock().unwrap();
        let err = store
            .get_or_create(&SessionId::new(), || orchestrator(ScriptedEngine::new(["hi"])))
            .unwrap_err();

        assert!(matches!(err, AgentError::Busy(_)));
        assert!(store.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_busy() {
        let call = "<tool_call>{\"name\": \"wait\"}</tool_call>";
        let slow = FnTool::new(ToolSchema::new("wait", "Slow tool"), |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok("waited".to_string())
        });
        let engine = ScriptedEngine::new([call, "done"]);
        let orchestrator = OrchestratorBuilder::new()
            .engine(Arc::new(engine))
            .tool(slow)
            .build()
            .unwrap();
        let session = Arc::new(ChatSession::new(SessionId::new(), orchestrator));

        let running = {
            let session = session.clone();
            tokio::spawn(async move { session.ask("first").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(session.ask("second").await, Err(AgentError::Busy(_))));
        assert!(session.turn_count().is_none());
        assert_eq!(running.await.unwrap().unwrap(), "done");
        assert_eq!(session.turn_count(), Some(5));
    }
}
