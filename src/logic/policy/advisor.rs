//! Policy Advisor - past incidents + current capabilities in, improvement
//! suggestions out
//!
//! The loop: each scan leaves incidents behind, each review of those
//! incidents proposes the next tools and data sources.

use serde_json::json;

use super::types::{Suggestion, SuggestionSet};
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};

const SYSTEM: &str = "You are the adaptive core of Vigil, a host defense agent that learns from every \
incident it handles. Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = "Review how well Vigil's current capabilities handled the recent incidents \
and propose what should change.

- Coverage: which incidents were handled well, and which only partially?
- Gaps: which tool, data source or reasoning change would have resolved an incident faster, \
or would catch a threat that the current capabilities miss?
- Proposals: turn each gap into one concrete, actionable suggestion, and tie its justification to \
the incidents below.

Recent Incidents:
{{recentIncidents}}

Current Capabilities:
{{currentCapabilities}}

Return {\"suggestions\": [{\"suggestion\": \"...\", \"justification\": \"...\", \"category\": \"...\"}]} \
where category is one of: New Tool, New Data Source, AI Model Enhancement, UX Improvement.";

const NO_INCIDENTS: &str = "No incidents have been recorded yet.";

pub struct PolicyAdvisor {
    agent: ToolLoop,
}

impl PolicyAdvisor {
    pub fn new(agent: ToolLoop) -> Self {
        Self { agent }
    }

    pub async fn suggest(&self, recent_incidents: &str, current_capabilities: &str) -> VigilResult<Vec<Suggestion>> {
        let incidents = if recent_incidents.trim().is_empty() {
            NO_INCIDENTS
        } else {
            recent_incidents
        };

        let text = render_template(
            INSTRUCTIONS,
            &[("recentIncidents", incidents), ("currentCapabilities", current_capabilities)],
        );
        let request = GenerateRequest::new(
            Stage::PolicyAdaptation,
            SYSTEM,
            text,
            json!({ "recentIncidents": incidents, "currentCapabilities": current_capabilities }),
        );

        let set: SuggestionSet = self.agent.single_shot(request).await?;
        log::info!("Policy review produced {} suggestion(s)", set.suggestions.len());
        Ok(set.suggestions)
    }
}
