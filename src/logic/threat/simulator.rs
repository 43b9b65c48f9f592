//! Threat Simulator - asks the backend for a synthetic snapshot
//!
//! Used to drive the whole pipeline without a compromised host.

use serde_json::json;

use super::prompt;
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};
use crate::logic::collector::SystemSnapshot;

pub struct ThreatSimulator {
    agent: ToolLoop,
}

impl ThreatSimulator {
    pub fn new(agent: ToolLoop) -> Self {
        Self { agent }
    }

    /// Generate one scenario, optionally steered by `hint`
    pub async fn simulate(&self, hint: Option<&str>) -> VigilResult<SystemSnapshot> {
        let hint = hint.unwrap_or("");
        let text = render_template(prompt::SIMULATOR, &[("hint", hint)]);
        let request = GenerateRequest::new(
            Stage::ThreatSimulation,
            prompt::SIMULATOR_SYSTEM,
            text,
            json!({ "hint": hint }),
        );

        let snapshot: SystemSnapshot = self.agent.single_shot(request).await?;
        log::info!(
            "Simulated scenario generated ({} process bytes, {} log bytes)",
            snapshot.processes.len(),
            snapshot.logs.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VigilError;
    use crate::logic::backend::ScriptedBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_simulated_snapshot_parses() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_final(
            Stage::ThreatSimulation,
            json!({
                "systemProcesses": "4242 svch0st.exe -enc SQBFAFgA",
                "logs": "Defender: real-time protection disabled",
                "binaries": "C:\\Users\\Public\\svch0st.exe (unsigned)",
                "networkConnections": "TCP 10.0.0.7:50122 203.0.113.50:443 ESTABLISHED"
            }),
        );

        let simulator = ThreatSimulator::new(ToolLoop::new(backend.clone(), 2));
        let snap = simulator.simulate(Some("unsigned binary")).await.unwrap();

        assert!(snap.processes.contains("svch0st.exe"));
        assert!(snap.binaries.contains("unsigned"));
        assert!(backend.requests()[0].messages[1].content.contains("Scenario focus: unsigned binary"));
        assert!(backend.requests()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_schema_violation() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_final(Stage::ThreatSimulation, json!({ "systemProcesses": "1 init" }));

        let simulator = ThreatSimulator::new(ToolLoop::new(backend, 2));
        let result = simulator.simulate(None).await;

        assert!(matches!(result, Err(VigilError::SchemaViolation { .. })));
    }
}
