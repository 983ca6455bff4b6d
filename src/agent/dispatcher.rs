//! Tool dispatcher: resolves the capability calls of one draft and folds the
//! results back into the run transcript.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;

use crate::agent::state::RunState;
use crate::context::RunContext;
use crate::error::ToolError;
use crate::llm::ToolCall;
use crate::tools::ToolRegistry;

/// Result of one dispatched call.
#[derive(Debug)]
pub struct CapabilityResult {
    /// Correlation ID of the originating call.
    pub call_id: String,
    pub name: String,
    pub outcome: Result<serde_json::Value, ToolError>,
}

impl CapabilityResult {
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Transcript payload: the tool's JSON output, or `{"error": ...}`.
    pub fn payload(&self) -> String {
        match &self.outcome {
            Ok(serde_json::Value::String(text)) => text.clone(),
            Ok(value) => value.to_string(),
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        }
    }
}

/// Executes capability calls against the registry.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    review_capability: String,
}

impl ToolDispatcher {
    /// `review_capability` names the call that flags a run for human review.
    pub fn new(registry: Arc<ToolRegistry>, review_capability: impl Into<String>) -> Self {
        Self {
            registry,
            review_capability: review_capability.into(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Resolve every call, append the results in issue order, and mark the
    /// run for review if the review capability was requested.
    pub async fn dispatch(&self, calls: &[ToolCall], state: &mut RunState) -> Vec<CapabilityResult> {
        if calls.iter().any(|c| c.name == self.review_capability) {
            state.mark_needs_review();
        }

        let ctx = state.run_context();
        let results = self.execute_parallel(calls, &ctx).await;

        let revision = state.revision_count();
        for result in &results {
            state
                .transcript
                .push_tool_result(&result.call_id, &result.name, result.payload(), revision);
        }
        results
    }

    /// Run calls concurrently; output order matches input order.
    async fn execute_parallel(&self, calls: &[ToolCall], ctx: &RunContext) -> Vec<CapabilityResult> {
        let futures: Vec<_> = calls
            .iter()
            .map(|call| async move {
                CapabilityResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    outcome: self.execute_one(call, ctx).await,
                }
            })
            .collect();

        join_all(futures).await
    }

    async fn execute_one(
        &self,
        call: &ToolCall,
        ctx: &RunContext,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .registry
            .lookup(&call.name)
            .await
            .ok_or_else(|| ToolError::NotFound {
                name: call.name.clone(),
            })
            .inspect_err(|_| {
                tracing::warn!(tool = %call.name, "Unknown capability requested");
            })?;

        tracing::info!(
            tool = %call.name,
            call_id = %call.id,
            params = %call.arguments,
            "Tool call started"
        );

        let tool_timeout = tool.execution_timeout();
        let start = Instant::now();
        let result =
            tokio::time::timeout(tool_timeout, tool.execute(call.arguments.clone(), ctx)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                tracing::debug!(tool = %call.name, elapsed_ms, "Tool call succeeded");
                Ok(output.result)
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, elapsed_ms, error = %e, "Tool call failed");
                Err(match e {
                    crate::tools::ToolError::InvalidParameters(reason) => {
                        ToolError::InvalidParameters {
                            name: call.name.clone(),
                            reason,
                        }
                    }
                    crate::tools::ToolError::ExecutionFailed(reason) => ToolError::ExecutionFailed {
                        name: call.name.clone(),
                        reason,
                    },
                })
            }
            Err(_) => {
                tracing::warn!(tool = %call.name, elapsed_ms, "Tool call timed out");
                Err(ToolError::Timeout {
                    name: call.name.clone(),
                    timeout: tool_timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct EchoTool {
        name: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Echo the arguments back"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            params: serde_json::Value,
            _ctx: &RunContext,
        ) -> Result<ToolOutput, crate::tools::ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolOutput::success(params, self.delay))
        }
        fn execution_timeout(&self) -> Duration {
            Duration::from_millis(200)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "flag_unknown_question"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &RunContext,
        ) -> Result<ToolOutput, crate::tools::ToolError> {
            Err(crate::tools::ToolError::ExecutionFailed("smtp down".into()))
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: json!({ "id": id }),
        }
    }

    async fn dispatcher() -> ToolDispatcher {
        let registry = Arc::new(ToolRegistry::new());
        registry
            .register(Arc::new(EchoTool {
                name: "slow",
                delay: Duration::from_millis(30),
            }))
            .await;
        registry
            .register(Arc::new(EchoTool {
                name: "fast",
                delay: Duration::ZERO,
            }))
            .await;
        registry
            .register(Arc::new(EchoTool {
                name: "stuck",
                delay: Duration::from_secs(5),
            }))
            .await;
        registry.register(Arc::new(FailingTool)).await;
        ToolDispatcher::new(registry, "flag_unknown_question")
    }

    #[tokio::test]
    async fn results_follow_issue_order() {
        let dispatcher = dispatcher().await;
        let mut state = RunState::new("sys", "hi");
        let calls = vec![call("c1", "slow"), call("c2", "fast")];

        let results = dispatcher.dispatch(&calls, &mut state).await;
        assert_eq!(results[0].call_id, "c1");
        assert_eq!(results[1].call_id, "c2");

        let ids: Vec<_> = state.transcript.entries()[2..]
            .iter()
            .map(|e| e.message.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn unknown_capability_is_an_error_result() {
        let dispatcher = dispatcher().await;
        let mut state = RunState::new("sys", "hi");

        let results = dispatcher
            .dispatch(&[call("c1", "send_fax")], &mut state)
            .await;
        assert!(results[0].is_error());
        let payload: serde_json::Value =
            serde_json::from_str(state.transcript.last().unwrap().content()).unwrap();
        assert!(
            payload["error"]
                .as_str()
                .unwrap()
                .contains("unknown capability")
        );
    }

    #[tokio::test]
    async fn review_flag_set_even_when_call_fails() {
        let dispatcher = dispatcher().await;
        let mut state = RunState::new("sys", "hi");

        let results = dispatcher
            .dispatch(&[call("c1", "flag_unknown_question")], &mut state)
            .await;
        assert!(results[0].is_error());
        assert!(state.needs_human_review());
    }

    #[tokio::test]
    async fn timeout_becomes_error_result() {
        let dispatcher = dispatcher().await;
        let mut state = RunState::new("sys", "hi");

        let results = dispatcher.dispatch(&[call("c1", "stuck")], &mut state).await;
        assert!(matches!(results[0].outcome, Err(ToolError::Timeout { .. })));
        assert!(!state.needs_human_review());
    }
}
