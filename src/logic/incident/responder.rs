//! Incident Responder - rationale + system state in, action log out
//!
//! Tool results are bound to the model's records by call position. The
//! model never gets to write a containment result itself.

use std::sync::Arc;

use serde_json::json;

use super::types::{ActionRecord, ActionType, IncidentResponse, NOT_EXECUTED};
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};
use crate::logic::tools::{ToolExecutor, ToolInvocation, ToolKind, Toolbox};

// ============================================================================
// PROMPT
// ============================================================================

const SYSTEM: &str = "You are the autonomous incident response core of Vigil. You do not ask for \
permission: you act, then report. Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = "Analyze the incident and the current system state.

Incident Data:
{{incidentData}}

System State:
{{systemState}}

Whenever a threat is identified you MUST neutralize it with the available tools:
- a malicious IP address: call blockIpAddress;
- a dangerous program: call uninstallProgram;
- a dangerously altered system setting: call changeSystemSetting to revert it.

Report one entry in \"actionsTaken\" per action, in the order you called the tools, with:
- actionType: blockIp, uninstallProgram or changeSetting (quarantineProcess / isolateFile for \
actions you could not execute);
- target: the IP, program or setting;
- reason: why you acted;
- result: leave empty, it is filled from the tool output.
Use actionType \"noAction\" only when there is no threat.

Finally give a clear, direct \"summary\" of the incident and of what you did.";

const NO_TOOLS_REASON: &str = "No containment tools are available on this host; nothing was executed.";

// ============================================================================
// RESPONDER
// ============================================================================

pub struct IncidentResponder {
    agent: ToolLoop,
    toolbox: Toolbox,
}

impl IncidentResponder {
    pub fn new(agent: ToolLoop, executor: Arc<ToolExecutor>) -> Self {
        Self {
            agent,
            toolbox: Toolbox::new(executor, &ToolKind::CONTAINMENT),
        }
    }

    pub fn has_tools(&self) -> bool {
        !self.toolbox.is_empty()
    }

    /// Raises only on malformed backend output or transport failure
    pub async fn respond(&self, incident_data: &str, system_state: &str) -> VigilResult<IncidentResponse> {
        if self.toolbox.is_empty() {
            log::warn!("Incident response skipped: no containment tools available");
            return Ok(IncidentResponse {
                actions_taken: vec![ActionRecord::no_action(NO_TOOLS_REASON)],
                summary: "Incident response could not act: no containment tools are available.".to_string(),
            });
        }

        let text = render_template(
            INSTRUCTIONS,
            &[("incidentData", incident_data), ("systemState", system_state)],
        );
        let request = GenerateRequest::new(
            Stage::IncidentResponse,
            SYSTEM,
            text,
            json!({ "incidentData": incident_data, "systemState": system_state }),
        );

        log::info!("Incident response started");
        let outcome = self.agent.run::<IncidentResponse>(request, Some(&self.toolbox)).await?;

        let containment: Vec<&ToolInvocation> = outcome
            .invocations
            .iter()
            .filter(|i| i.is_containment())
            .collect();

        let mut response = outcome.output;
        response.actions_taken = bind_results(response.actions_taken, &containment);

        log::info!(
            "Incident response finished: {} record(s), {} containment call(s)",
            response.actions_taken.len(),
            containment.len()
        );
        Ok(response)
    }
}

/// Positional binding of containment invocations onto tool-backed records
pub fn bind_results(records: Vec<ActionRecord>, invocations: &[&ToolInvocation]) -> Vec<ActionRecord> {
    let mut bound = Vec::with_capacity(records.len().max(invocations.len()));
    let mut pending = invocations.iter();
    let mut no_action = Vec::new();

    for mut record in records {
        match record.action_type {
            ActionType::NoAction => no_action.push(record),
            ActionType::QuarantineProcess | ActionType::IsolateFile => {
                record.result = format!("{}: no tool is available for this action.", NOT_EXECUTED);
                bound.push(record);
            }
            _ => {
                match pending.next() {
                    Some(inv) => apply(&mut record, inv),
                    None => {
                        record.result = format!("{}: no matching tool call was made.", NOT_EXECUTED);
                    }
                }
                bound.push(record);
            }
        }
    }

    // Calls the model ran but did not report
    for inv in pending {
        let Some(action_type) = inv.kind.and_then(ActionType::for_tool) else {
            continue;
        };
        bound.push(ActionRecord {
            action_type,
            target: inv.target(),
            reason: "Executed during incident response (not reported by the model).".to_string(),
            result: inv.result.clone(),
        });
    }

    let acted = bound.iter().any(|r| r.action_type.tool().is_some());
    if !acted {
        bound.extend(no_action);
    }
    if bound.is_empty() {
        bound.push(ActionRecord::no_action("No containment action was reported."));
    }
    bound
}

fn apply(record: &mut ActionRecord, inv: &ToolInvocation) {
    if let Some(actual) = inv.kind.and_then(ActionType::for_tool) {
        if actual != record.action_type {
            log::debug!(
                "Record type {:?} corrected to {:?} from call {}",
                record.action_type,
                actual,
                inv.call_id
            );
            record.action_type = actual;
        }
    }
    let target = inv.target();
    if !target.is_empty() {
        record.target = target;
    }
    record.result = inv.result.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VigilError;
    use crate::logic::backend::{ScriptedBackend, ToolCall};
    use crate::logic::config::Platform;
    use crate::logic::honeypot::HoneypotStore;
    use crate::logic::tools::SimulatedRunner;

    fn build(disabled: &[ToolKind]) -> (Arc<ScriptedBackend>, Arc<SimulatedRunner>, IncidentResponder) {
        let backend = Arc::new(ScriptedBackend::new());
        let runner = Arc::new(SimulatedRunner::new());
        let executor = ToolExecutor::new(runner.clone(), Platform::Unix, Arc::new(HoneypotStore::with_seed(4)))
            .with_disabled(disabled);
        let responder = IncidentResponder::new(ToolLoop::new(backend.clone(), 6), Arc::new(executor));
        (backend, runner, responder)
    }

    #[tokio::test]
    async fn test_block_ip_result_bound_from_tool() {
        let (backend, runner, responder) = build(&[]);
        backend.push_tool_calls(
            Stage::IncidentResponse,
            vec![ToolCall::new("c1", "blockIpAddress", json!({ "ip": "198.51.100.24" }))],
        );
        backend.push_final(
            Stage::IncidentResponse,
            json!({
                "actionsTaken": [{
                    "actionType": "blockIp",
                    "target": "198.51.100.24",
                    "reason": "evil.exe beacons to this address",
                    "result": "I blocked it"
                }],
                "summary": "Blocked the C2 address."
            }),
        );

        let response = responder.respond("evil.exe C2", "Processes:\nevil.exe").await.unwrap();

        assert_eq!(response.actions_taken.len(), 1);
        let record = &response.actions_taken[0];
        assert_eq!(record.action_type, ActionType::BlockIp);
        assert_eq!(record.target, "198.51.100.24");
        assert_eq!(record.result, "Simulated execution of: ufw insert 1 deny from 198.51.100.24");
        assert_eq!(runner.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_only_containment_tools_advertised() {
        let (backend, _, responder) = build(&[]);
        backend.push_final(Stage::IncidentResponse, json!({ "actionsTaken": [], "summary": "none" }));

        let response = responder.respond("r", "s").await.unwrap();

        let request = backend.first_request(Stage::IncidentResponse).unwrap();
        assert_eq!(request.tool_names(), vec!["blockIpAddress", "uninstallProgram", "changeSystemSetting"]);
        assert_eq!(response.actions_taken.len(), 1);
        assert_eq!(response.actions_taken[0].action_type, ActionType::NoAction);
    }

    #[tokio::test]
    async fn test_no_tools_means_no_action_without_backend() {
        let (backend, _, responder) = build(&ToolKind::CONTAINMENT);

        let response = responder.respond("r", "s").await.unwrap();

        assert!(!responder.has_tools());
        assert_eq!(response.actions_taken[0].action_type, ActionType::NoAction);
        assert!(response.actions_taken[0].reason.contains("No containment tools"));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_reported_as_result() {
        let (backend, _, responder) = build(&[]);
        backend.push_tool_calls(
            Stage::IncidentResponse,
            vec![ToolCall::new("c1", "uninstallProgram", json!({}))],
        );
        backend.push_final(
            Stage::IncidentResponse,
            json!({ "actionsTaken": [{ "actionType": "uninstallProgram", "target": "evil", "reason": "r" }], "summary": "s" }),
        );

        let response = responder.respond("r", "s").await.unwrap();

        assert!(response.actions_taken[0].result.starts_with("Error: invalid arguments"));
    }

    #[tokio::test]
    async fn test_malformed_output_raises() {
        let (backend, _, responder) = build(&[]);
        backend.push_final(Stage::IncidentResponse, json!({ "actionsTaken": "blocked stuff" }));

        let result = responder.respond("r", "s").await;
        assert!(matches!(result, Err(VigilError::SchemaViolation { .. })));
    }

    fn invocation(kind: ToolKind, args: serde_json::Value, result: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: "c".into(),
            name: kind.name().into(),
            kind: Some(kind),
            arguments: args,
            result: result.into(),
            status: crate::logic::tools::InvocationStatus::Completed,
        }
    }

    fn record(action_type: ActionType, target: &str) -> ActionRecord {
        ActionRecord {
            action_type,
            target: target.into(),
            reason: "r".into(),
            result: String::new(),
        }
    }

    #[test]
    fn test_binding_is_positional() {
        let a = invocation(ToolKind::BlockIpAddress, json!({ "ip": "203.0.113.9" }), "first");
        let b = invocation(ToolKind::UninstallProgram, json!({ "programName": "evil.exe" }), "second");

        let bound = bind_results(
            vec![
                record(ActionType::BlockIp, "203.0.113.9"),
                record(ActionType::QuarantineProcess, "4242"),
                record(ActionType::UninstallProgram, "evil.exe"),
            ],
            &[&a, &b],
        );

        assert_eq!(bound[0].result, "first");
        assert!(bound[1].result.starts_with(NOT_EXECUTED));
        assert_eq!(bound[2].result, "second");
    }

    #[test]
    fn test_unreported_calls_are_appended_and_no_action_dropped() {
        let a = invocation(ToolKind::BlockIpAddress, json!({ "ip": "203.0.113.9" }), "blocked");

        let bound = bind_results(vec![record(ActionType::NoAction, "")], &[&a]);

        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].action_type, ActionType::BlockIp);
        assert_eq!(bound[0].target, "203.0.113.9");
        assert_eq!(bound[0].result, "blocked");
    }

    #[test]
    fn test_reported_but_not_called() {
        let bound = bind_results(vec![record(ActionType::ChangeSetting, "net.ipv4.ip_forward")], &[]);
        assert!(bound[0].result.contains("no matching tool call"));
    }
}
