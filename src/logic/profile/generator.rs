//! Attacker Profiler - incident evidence in, attacker profile out
//!
//! No tools. The model writes the profile, then the literal indicators in
//! the evidence are merged in and the level policy has the last word.

use serde_json::json;

use super::ioc::{extract_indicators, merge_indicators};
use super::level::{ModelAssessed, ProfileEvidence, ThreatLevelPolicy};
use super::types::{AttackerProfile, ProfileEnvelope, ProfileRequest};
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};

const SYSTEM: &str = "You are a senior threat-intelligence analyst writing attacker profiles that will be \
handed to law enforcement. Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = "Build a profile of the adversary behind this incident from the evidence below. \
Treat the way the attacker chains their actions as a behavioral fingerprint, and the indicators they \
leave behind as tracking beacons that let them be recognized again.

Incident Data:
{{incidentData}}

Logs:
{{logs}}

Descriptors:
{{descriptors}}

System States:
{{systemStates}}

Return {\"attackerProfile\": {...}} with:
- threatLevel: one of Low, Medium, High, Critical;
- techniques: the observed tactics, techniques and procedures, in the order they happened;
- motives: the likely motives;
- indicatorsOfCompromise: every IP address, domain, file hash and suspicious username present in the \
evidence. Leave none out: this list is what identifies the attacker later;
- summary: a factual, professional account of the attacker and the incident.";

pub struct AttackerProfiler {
    agent: ToolLoop,
    level_policy: Box<dyn ThreatLevelPolicy>,
}

impl AttackerProfiler {
    pub fn new(agent: ToolLoop) -> Self {
        Self {
            agent,
            level_policy: Box::new(ModelAssessed),
        }
    }

    pub fn with_level_policy(mut self, policy: Box<dyn ThreatLevelPolicy>) -> Self {
        self.level_policy = policy;
        self
    }

    pub async fn profile(&self, request: &ProfileRequest) -> VigilResult<AttackerProfile> {
        let text = render_template(
            INSTRUCTIONS,
            &[
                ("incidentData", request.incident_data.as_str()),
                ("logs", request.logs.as_str()),
                ("descriptors", request.descriptors.as_str()),
                ("systemStates", request.system_states.as_str()),
            ],
        );
        let input = serde_json::to_value(request).unwrap_or_else(|_| json!({}));
        let generate = GenerateRequest::new(Stage::AttackerProfile, SYSTEM, text, input);

        log::info!("Attacker profiling started");
        let envelope: ProfileEnvelope = self.agent.single_shot(generate).await?;
        let mut profile = envelope.into_profile();

        let extracted = extract_indicators(&request.corpus());
        let model_count = profile.indicators_of_compromise.len();
        profile.indicators_of_compromise =
            merge_indicators(std::mem::take(&mut profile.indicators_of_compromise), &extracted);
        if profile.indicators_of_compromise.len() > model_count {
            log::debug!(
                "Added {} indicator(s) the model left out",
                profile.indicators_of_compromise.len() - model_count
            );
        }

        let evidence = ProfileEvidence {
            indicator_count: profile.indicators_of_compromise.len(),
            containment_actions: request.containment_actions,
        };
        let assessed = self.level_policy.assess(profile.threat_level, &evidence);
        if assessed != profile.threat_level {
            log::info!(
                "Threat level raised from {} to {} by {} policy",
                profile.threat_level,
                assessed,
                self.level_policy.name()
            );
            profile.threat_level = assessed;
        }

        log::info!(
            "Attacker profile ready: level={}, {} indicator(s)",
            profile.threat_level,
            profile.indicators_of_compromise.len()
        );
        Ok(profile)
    }
}
