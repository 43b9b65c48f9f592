//! Agent - bounded tool loop between a stage and the reasoning backend
//!
//! Send the request; while the backend asks for tools, run them one by one
//! in the requested order, append the results and ask again; stop at the
//! first final payload or when the turn budget is spent.

pub mod extract;
pub mod lenient;
pub mod prompt;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{VigilError, VigilResult};
use crate::logic::backend::{BackendReply, GenerateRequest, Message, ReasoningBackend};
use crate::logic::tools::{InvocationStatus, ToolInvocation, ToolKind, Toolbox};

pub use extract::{extract_json_object, parse_final};
pub use prompt::render_template;

/// Parsed final payload plus every tool invocation, in execution order
#[derive(Debug, Clone)]
pub struct LoopOutcome<T> {
    pub output: T,
    pub invocations: Vec<ToolInvocation>,
}

impl<T> LoopOutcome<T> {
    /// Containment invocations that actually reached an executor
    pub fn executed_containment(&self) -> Vec<&ToolInvocation> {
        self.invocations
            .iter()
            .filter(|i| i.is_containment() && i.status != InvocationStatus::Rejected)
            .collect()
    }
}

#[derive(Clone)]
pub struct ToolLoop {
    backend: Arc<dyn ReasoningBackend>,
    max_turns: usize,
}

impl ToolLoop {
    pub fn new(backend: Arc<dyn ReasoningBackend>, max_turns: usize) -> Self {
        Self {
            backend,
            max_turns: max_turns.max(1),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ReasoningBackend> {
        &self.backend
    }

    /// Run a stage with optional tools. Backend errors propagate unchanged.
    pub async fn run<T: DeserializeOwned>(
        &self,
        mut request: GenerateRequest,
        toolbox: Option<&Toolbox>,
    ) -> VigilResult<LoopOutcome<T>> {
        let stage = request.stage;
        request.tools = toolbox.map(Toolbox::definitions).unwrap_or_default();

        let mut invocations = Vec::new();

        for turn in 1..=self.max_turns {
            let reply = self.backend.generate(&request).await?;

            match reply {
                BackendReply::Final(text) => {
                    log::debug!("[{}] Final reply after {} turn(s)", stage, turn);
                    let output = parse_final(stage.name(), &text)?;
                    return Ok(LoopOutcome { output, invocations });
                }
                BackendReply::ToolCalls(calls) => {
                    log::info!(
                        "[{}] Turn {}: backend requested {} tool call(s)",
                        stage,
                        turn,
                        calls.len()
                    );
                    request.messages.push(Message::tool_requests(calls.clone()));

                    // Sequential on purpose: results bind to calls by position
                    for call in &calls {
                        let invocation = match toolbox {
                            Some(tb) => tb.dispatch(call).await,
                            None => ToolInvocation {
                                call_id: call.id.clone(),
                                name: call.name.clone(),
                                kind: ToolKind::from_name(&call.name),
                                arguments: call.arguments.clone(),
                                result: "Error: no tools are available at this stage.".to_string(),
                                status: InvocationStatus::Rejected,
                            },
                        };
                        log::debug!("[{}] {} -> {}", stage, invocation.name, invocation.result);
                        request
                            .messages
                            .push(Message::tool_result(&call.id, &invocation.result));
                        invocations.push(invocation);
                    }
                }
            }
        }

        Err(VigilError::schema(
            stage.name(),
            format!("no final answer within {} turns", self.max_turns),
        ))
    }

    /// Tool-less single round trip
    pub async fn single_shot<T: DeserializeOwned>(&self, request: GenerateRequest) -> VigilResult<T> {
        Ok(self.run(request, None).await?.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::backend::{Role, ScriptedBackend, Stage, ToolCall};
    use crate::logic::config::Platform;
    use crate::logic::honeypot::HoneypotStore;
    use crate::logic::tools::{SimulatedRunner, ToolExecutor};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Answer {
        done: bool,
    }

    fn toolbox(kinds: &[ToolKind]) -> (Arc<SimulatedRunner>, Toolbox) {
        let runner = Arc::new(SimulatedRunner::new());
        let executor = ToolExecutor::new(runner.clone(), Platform::Unix, Arc::new(HoneypotStore::with_seed(5)));
        (runner, Toolbox::new(Arc::new(executor), kinds))
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(Stage::ThreatReasoning, "sys", "analyze", json!({}))
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_requested_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_tool_calls(
            Stage::ThreatReasoning,
            vec![
                ToolCall::new("a", "runWhois", json!({ "target": "evil.example" })),
                ToolCall::new("b", "runPortScan", json!({ "host": "198.51.100.24" })),
            ],
        );
        backend.push_final(Stage::ThreatReasoning, json!({ "done": true }));

        let (runner, tb) = toolbox(&ToolKind::INVESTIGATIVE);
        let outcome: LoopOutcome<Answer> = ToolLoop::new(backend.clone(), 4)
            .run(request(), Some(&tb))
            .await
            .unwrap();

        assert!(outcome.output.done);
        assert_eq!(outcome.invocations.len(), 2);
        assert_eq!(outcome.invocations[0].name, "runWhois");
        assert_eq!(outcome.invocations[1].name, "runPortScan");
        assert_eq!(
            runner.executed(),
            vec!["whois evil.example".to_string(), "nmap -F 198.51.100.24".to_string()]
        );

        // Second request carries the tool turn and both results
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1].messages;
        assert_eq!(follow_up.len(), 5);
        assert_eq!(follow_up[3].role, Role::Tool);
        assert_eq!(follow_up[3].tool_call_id.as_deref(), Some("a"));
        assert_eq!(requests[0].tools.len(), ToolKind::INVESTIGATIVE.len());
    }

    #[tokio::test]
    async fn test_turn_budget_exhausted_is_schema_violation() {
        let backend = Arc::new(ScriptedBackend::new());
        for i in 0..3 {
            backend.push_tool_calls(
                Stage::ThreatReasoning,
                vec![ToolCall::new(format!("c{}", i), "runDig", json!({ "domain": "x.org" }))],
            );
        }

        let (_, tb) = toolbox(&ToolKind::INVESTIGATIVE);
        let result = ToolLoop::new(backend, 3).run::<Answer>(request(), Some(&tb)).await;

        assert!(matches!(result, Err(VigilError::SchemaViolation { .. })));
    }

    #[tokio::test]
    async fn test_malformed_final_is_schema_violation() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_final(Stage::ThreatReasoning, json!("I think everything is fine."));

        let result = ToolLoop::new(backend, 3).single_shot::<Answer>(request()).await;
        match result {
            Err(VigilError::SchemaViolation { stage, .. }) => assert_eq!(stage, "threatReasoning"),
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_error(Stage::ThreatReasoning, VigilError::Backend("connection reset".into()));

        let result = ToolLoop::new(backend, 3).single_shot::<Answer>(request()).await;
        assert!(matches!(result, Err(VigilError::Backend(_))));
    }

    #[tokio::test]
    async fn test_tool_request_without_toolbox_is_answered_with_error() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_tool_calls(
            Stage::ThreatReasoning,
            vec![ToolCall::new("a", "blockIpAddress", json!({ "ip": "198.51.100.24" }))],
        );
        backend.push_final(Stage::ThreatReasoning, json!({ "done": false }));

        let outcome: LoopOutcome<Answer> = ToolLoop::new(backend, 3).run(request(), None).await.unwrap();

        assert_eq!(outcome.invocations[0].status, InvocationStatus::Rejected);
        assert!(outcome.executed_containment().is_empty());
    }
}
