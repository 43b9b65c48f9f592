use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::error::VigilError;
use crate::logic::backend::{ScriptedBackend, ToolCall};
use crate::logic::config::{Platform, ReasoningPolicy};
use crate::logic::incident::ActionType;
use crate::logic::profile::ThreatLevel;
use crate::logic::tools::SimulatedRunner;

// ============================================================================
// FIXTURES
// ============================================================================

struct Fixture {
    backend: Arc<ScriptedBackend>,
    runner: Arc<SimulatedRunner>,
    pipeline: Pipeline,
}

fn fixture(autonomous: bool) -> Fixture {
    let backend = Arc::new(ScriptedBackend::new());
    let runner = Arc::new(SimulatedRunner::new());
    let executor = Arc::new(ToolExecutor::new(
        runner.clone(),
        Platform::Unix,
        Arc::new(HoneypotStore::with_seed(7)),
    ));

    let mut config = VigilConfig::default();
    config.policy = ReasoningPolicy { autonomous };
    config.pipeline.max_tool_turns = 4;

    let pipeline = Pipeline::new(config, backend.clone(), executor);
    Fixture {
        backend,
        runner,
        pipeline,
    }
}

fn evil_snapshot() -> SystemSnapshot {
    SystemSnapshot::new("1234 evil.exe\n88 sshd", "kernel: audit ok")
        .with_network_connections("TCP 10.0.0.5:51234 198.51.100.24:4444 ESTABLISHED")
}

const EVIL_REASONING: &str = "evil.exe (pid 1234) holds an outbound session to 198.51.100.24:4444, \
a port commonly used by reverse shells.";

fn push_malicious_verdict(backend: &ScriptedBackend) {
    backend.push_final(
        Stage::ThreatReasoning,
        json!({
            "isMalicious": true,
            "reasoning": EVIL_REASONING,
            "recommendedActions": "Block 198.51.100.24"
        }),
    );
}

fn push_block_ip_response(backend: &ScriptedBackend) {
    backend.push_tool_calls(
        Stage::IncidentResponse,
        vec![ToolCall::new("ir-1", "blockIpAddress", json!({ "ip": "198.51.100.24" }))],
    );
    backend.push_final(
        Stage::IncidentResponse,
        json!({
            "actionsTaken": [{
                "actionType": "blockIp",
                "target": "198.51.100.24",
                "reason": "Reverse shell endpoint"
            }],
            "summary": "Blocked the reverse shell endpoint 198.51.100.24."
        }),
    );
}

fn push_profile(backend: &ScriptedBackend) {
    backend.push_final(
        Stage::AttackerProfile,
        json!({
            "attackerProfile": {
                "threatLevel": "High",
                "techniques": ["Reverse shell over a non-standard port"],
                "motives": ["remote control"],
                "indicatorsOfCompromise": ["198.51.100.24"],
                "summary": "Hands-on-keyboard operator using a reverse shell."
            }
        }),
    );
}

// ============================================================================
// RUNS
// ============================================================================

#[tokio::test]
async fn test_benign_run_stops_after_reasoning() {
    let f = fixture(true);
    f.backend.push_final(
        Stage::ThreatReasoning,
        json!({ "isMalicious": false, "reasoning": "Only system services are running.", "actionsTaken": "" }),
    );

    let outcome = f
        .pipeline
        .run(SystemSnapshot::new("1 systemd\n88 sshd", "kernel: audit ok"))
        .await
        .unwrap();

    assert!(!outcome.is_malicious());
    assert!(matches!(outcome.disposition, Disposition::Benign));
    assert!(outcome.response().is_none());
    assert_eq!(f.backend.stages_called(), vec![Stage::ThreatReasoning]);
    assert!(f.runner.executed().is_empty());
}

#[tokio::test]
async fn test_malicious_run_blocks_the_c2_address() {
    let f = fixture(true);
    push_malicious_verdict(&f.backend);
    push_block_ip_response(&f.backend);
    push_profile(&f.backend);

    let outcome = f.pipeline.run(evil_snapshot()).await.unwrap();

    let response = outcome.response().unwrap();
    assert_eq!(response.actions_taken.len(), 1);
    assert_eq!(response.actions_taken[0].action_type, ActionType::BlockIp);
    assert_eq!(response.actions_taken[0].target, "198.51.100.24");
    assert_eq!(f.runner.executed(), vec!["ufw insert 1 deny from 198.51.100.24".to_string()]);
    assert_eq!(outcome.profile().unwrap().threat_level, ThreatLevel::High);
}

#[tokio::test]
async fn test_stage_order_and_rationale_flow() {
    let f = fixture(true);
    push_malicious_verdict(&f.backend);
    push_block_ip_response(&f.backend);
    push_profile(&f.backend);

    f.pipeline.run(evil_snapshot()).await.unwrap();

    let stages: Vec<Stage> = f.backend.stages_called();
    let ir = stages.iter().position(|s| *s == Stage::IncidentResponse).unwrap();
    let profile = stages.iter().position(|s| *s == Stage::AttackerProfile).unwrap();
    assert!(ir < profile);

    let ir_request = f.backend.first_request(Stage::IncidentResponse).unwrap();
    assert_eq!(ir_request.input["incidentData"], EVIL_REASONING);
    assert!(ir_request.input["systemState"].as_str().unwrap().contains("evil.exe"));

    let profile_request = f.backend.first_request(Stage::AttackerProfile).unwrap();
    assert_eq!(profile_request.input["incidentData"], EVIL_REASONING);
    assert_eq!(profile_request.input["logs"], "kernel: audit ok");
    let states = profile_request.input["systemStates"].as_str().unwrap();
    assert!(states.contains("Containment Actions:\n- blockIp 198.51.100.24: Simulated execution of"));
    let descriptors = profile_request.input["descriptors"].as_str().unwrap();
    assert!(descriptors.starts_with("AI-Detected Anomaly. Response: Blocked"));
}

#[tokio::test]
async fn test_analysis_only_waits_for_confirmation() {
    let f = fixture(false);
    push_malicious_verdict(&f.backend);

    let outcome = f.pipeline.run(evil_snapshot()).await.unwrap();

    let Disposition::AwaitingConfirmation { approval_id, user_query } = outcome.disposition else {
        panic!("expected a pending approval");
    };
    assert!(user_query.contains("Block 198.51.100.24"));
    assert_eq!(f.backend.stages_called(), vec![Stage::ThreatReasoning]);
    assert!(f.runner.executed().is_empty());

    push_block_ip_response(&f.backend);
    push_profile(&f.backend);
    let confirmed = f.pipeline.confirm(&approval_id).await.unwrap().unwrap();

    assert_eq!(confirmed.run_id, outcome.run_id);
    assert_eq!(confirmed.response().unwrap().containment_count(), 1);
    assert_eq!(f.runner.executed().len(), 1);
    assert!(f.pipeline.confirm(&approval_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_dismissed_approval_never_runs() {
    let f = fixture(false);
    push_malicious_verdict(&f.backend);

    let outcome = f.pipeline.run(evil_snapshot()).await.unwrap();
    let Disposition::AwaitingConfirmation { approval_id, .. } = outcome.disposition else {
        panic!("expected a pending approval");
    };

    assert!(f.pipeline.dismiss(&approval_id));
    assert!(f.pipeline.confirm(&approval_id).await.unwrap().is_none());
    assert!(f.runner.executed().is_empty());
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_backend_failure_in_reasoning() {
    let f = fixture(true);
    f.backend
        .push_error(Stage::ThreatReasoning, VigilError::Backend("connection refused".into()));

    let err = f.pipeline.run(evil_snapshot()).await.unwrap_err();

    assert_eq!(err.stage, Stage::ThreatReasoning);
    assert_eq!(err.error.kind(), "backend_communication_failure");
    assert!(err.partial.verdict.is_none());
}

#[tokio::test]
async fn test_containment_is_not_rolled_back_on_failure() {
    let f = fixture(true);
    push_malicious_verdict(&f.backend);
    f.backend.push_tool_calls(
        Stage::IncidentResponse,
        vec![ToolCall::new("ir-1", "blockIpAddress", json!({ "ip": "198.51.100.24" }))],
    );
    f.backend.push_final(Stage::IncidentResponse, json!("Blocked it, all good."));

    let err = f.pipeline.run(evil_snapshot()).await.unwrap_err();

    assert_eq!(err.stage, Stage::IncidentResponse);
    assert!(matches!(err.error, VigilError::SchemaViolation { .. }));
    assert_eq!(err.partial.verdict.as_ref().unwrap().reasoning, EVIL_REASONING);
    assert_eq!(f.runner.executed().len(), 1);
    assert!(f.backend.first_request(Stage::AttackerProfile).is_none());
}

#[tokio::test]
async fn test_profile_failure_keeps_response() {
    let f = fixture(true);
    push_malicious_verdict(&f.backend);
    push_block_ip_response(&f.backend);
    f.backend.push_final(Stage::AttackerProfile, json!({ "attackerProfile": { "threatLevel": "Severe" } }));

    let err = f.pipeline.run(evil_snapshot()).await.unwrap_err();

    assert_eq!(err.stage, Stage::AttackerProfile);
    assert_eq!(err.partial.response.as_ref().unwrap().containment_count(), 1);
    assert_eq!(err.report()["stage"], "attackerProfile");
}

// ============================================================================
// SCAN
// ============================================================================

struct CannedSource;

#[async_trait]
impl SnapshotSource for CannedSource {
    async fn processes(&self) -> String {
        "1 systemd\n88 sshd".into()
    }

    async fn network_connections(&self) -> String {
        "tcp LISTEN 0.0.0.0:22".into()
    }

    async fn discovered_services(&self) -> String {
        String::new()
    }

    async fn logs(&self) -> String {
        "kernel: audit ok".into()
    }
}

#[tokio::test]
async fn test_scan_collects_then_runs() {
    let f = fixture(true);
    f.backend.push_final(
        Stage::ThreatReasoning,
        json!({ "isMalicious": false, "reasoning": "Baseline host.", "actionsTaken": "" }),
    );

    let outcome = f.pipeline.scan(&CannedSource).await.unwrap();

    assert!(!outcome.is_malicious());
    let request = f.backend.first_request(Stage::ThreatReasoning).unwrap();
    assert_eq!(request.input["processes"], "1 systemd\n88 sshd");
    assert_eq!(request.input["networkConnections"], "tcp LISTEN 0.0.0.0:22");
}
