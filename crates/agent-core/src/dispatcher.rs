//! Tool Dispatcher
//!
//! Runs every call of one round concurrently and waits for all of them.
//! Each request yields exactly one result; nothing a tool does can fail the
//! round.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;

use crate::error::AgentError;
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Separator between results folded into one tool turn
pub const RESULT_SEPARATOR: &str = "\n\n";

/// Executes tool calls against a registry
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Bound each call; a call still running after `timeout` becomes an error result
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatch all calls concurrently. Results come back in request order.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, "Executing tool");

        let execution = AssertUnwindSafe(self.registry.execute(call)).catch_unwind();
        let settled = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(settled) => settled,
                Err(_) => Ok(Err(AgentError::ToolTimeout {
                    name: call.name.clone(),
                    after: limit,
                })),
            },
            None => execution.await,
        };

        let result = match settled {
            Ok(Ok(output)) => ToolResult::success(&call.name, output),
            Ok(Err(AgentError::ToolNotFound(name))) => {
                tracing::warn!(tool = %name, "Model requested an unknown tool");
                ToolResult::failure(
                    &call.name,
                    format!(
                        "No tool named '{}' exists. Available tools: {}.",
                        name,
                        self.registry.names().join(", ")
                    ),
                )
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::failure(&call.name, e.to_string())
            }
            Err(_) => {
                tracing::error!(tool = %call.name, "Tool panicked");
                ToolResult::failure(&call.name, "The tool crashed while running.")
            }
        };

        result.with_id(call.id.clone())
    }
}

/// Fold one round's results into the content of a single tool turn
pub fn join_results(results: &[ToolResult]) -> String {
    results
        .iter()
        .map(ToolResult::to_turn_text)
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FnTool, ToolArguments, ToolSchema};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(FnTool::new(ToolSchema::new("fast", "Fast"), |_| async {
                Ok("fast done".to_string())
            }))
            .unwrap();
        registry
            .register(FnTool::new(ToolSchema::new("slow", "Slow"), |_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("slow done".to_string())
            }))
            .unwrap();
        registry
            .register(FnTool::new(ToolSchema::new("broken", "Fails"), |_| async {
                Err::<String, _>(AgentError::ToolExecution("disk on fire".into()))
            }))
            .unwrap();
        registry
            .register(FnTool::new(ToolSchema::new("hang", "Never settles"), |_| async {
                futures::future::pending::<()>().await;
                Ok(String::new())
            }))
            .unwrap();
        registry
            .register(FnTool::new(ToolSchema::new("panics", "Panics"), |args: ToolArguments| async move {
                if args.is_empty() {
                    panic!("unexpected input");
                }
                Ok(String::new())
            }))
            .unwrap();
        registry
    }

    fn call(name: &str) -> ToolCall {
        let mut call = ToolCall::new(name, ToolArguments::new());
        call.id = Some(format!("id-{}", name));
        call
    }

    #[tokio::test]
    async fn test_one_result_per_request() {
        let dispatcher = ToolDispatcher::new(Arc::new(registry()));
        let calls = vec![call("fast"), call("missing"), call("broken"), call("fast")];

        let results = dispatcher.dispatch(&calls).await;

        assert_eq!(results.len(), 4);
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fast", "missing", "broken", "fast"]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].output.contains("No tool named 'missing'"));
        assert!(!results[2].success);
        assert!(results[2].output.contains("disk on fire"));
        assert_eq!(results[1].id.as_deref(), Some("id-missing"));
    }

    #[tokio::test]
    async fn test_slow_and_fast_both_present() {
        let dispatcher = ToolDispatcher::new(Arc::new(registry()));
        let results = dispatcher.dispatch(&[call("slow"), call("fast")]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].output, "slow done");
        assert_eq!(results[1].output, "fast done");
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        let (r, p) = (running.clone(), peak.clone());
        registry
            .register(FnTool::new(ToolSchema::new("wait", "Wait"), move |_| {
                let (r, p) = (r.clone(), p.clone());
                async move {
                    let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    r.fetch_sub(1, Ordering::SeqCst);
                    Ok("ok".to_string())
                }
            }))
            .unwrap();

        let dispatcher = ToolDispatcher::new(Arc::new(registry));
        let results = dispatcher.dispatch(&[call("wait"), call("wait"), call("wait")]).await;

        assert_eq!(results.len(), 3);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_error_result() {
        let dispatcher = ToolDispatcher::new(Arc::new(registry()))
            .with_timeout(Some(Duration::from_secs(5)));

        let results = dispatcher.dispatch(&[call("hang"), call("fast")]).await;

        assert!(!results[0].success);
        assert!(results[0].output.contains("timed out"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let dispatcher = ToolDispatcher::new(Arc::new(registry()));
        let results = dispatcher.dispatch(&[call("panics")]).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
    }

    #[test]
    fn test_join_results() {
        let joined = join_results(&[
            ToolResult::success("a", "one"),
            ToolResult::failure("b", "bad"),
        ]);
        assert_eq!(joined, "one\n\n[Tool 'b' failed]\nbad");
    }
}
