//! Threat Reasoner - snapshot in, verdict out
//!
//! Runs the tool loop with the toolbox the reasoning policy allows.

use std::sync::Arc;

use serde_json::json;

use super::prompt;
use super::types::{ReasoningOutcome, ReasoningVerdict, VerdictReply};
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};
use crate::logic::collector::SystemSnapshot;
use crate::logic::config::ReasoningPolicy;
use crate::logic::tools::{ToolExecutor, ToolInvocation, ToolKind, Toolbox};

/// Longest rationale excerpt used in a synthesized confirmation prompt
const QUERY_EXCERPT_CHARS: usize = 160;

pub struct ThreatReasoner {
    agent: ToolLoop,
    toolbox: Toolbox,
    policy: ReasoningPolicy,
}

impl ThreatReasoner {
    pub fn new(agent: ToolLoop, executor: Arc<ToolExecutor>, policy: ReasoningPolicy) -> Self {
        let kinds: Vec<ToolKind> = if policy.autonomous {
            ToolKind::ALL.to_vec()
        } else {
            ToolKind::INVESTIGATIVE
                .iter()
                .chain(ToolKind::HONEYPOT.iter())
                .copied()
                .collect()
        };

        Self {
            agent,
            toolbox: Toolbox::new(executor, &kinds),
            policy,
        }
    }

    pub fn policy(&self) -> ReasoningPolicy {
        self.policy
    }

    /// Tools advertised to the backend
    pub fn advertised(&self) -> &[ToolKind] {
        self.toolbox.allowed()
    }

    pub async fn reason(&self, snapshot: &SystemSnapshot) -> VigilResult<ReasoningOutcome> {
        let request = self.build_request(snapshot);
        log::info!(
            "Threat reasoning started ({} mode, {} tools)",
            if self.policy.autonomous { "autonomous" } else { "analysis-only" },
            self.toolbox.allowed().len()
        );

        let outcome = self.agent.run::<VerdictReply>(request, Some(&self.toolbox)).await?;
        let executed: Vec<ToolInvocation> = outcome.executed_containment().into_iter().cloned().collect();

        let mut verdict = outcome.output.into_verdict(self.policy.autonomous);
        if self.policy.autonomous {
            if verdict.recommended_actions.trim().is_empty() && !executed.is_empty() {
                verdict.recommended_actions = describe_executed(&executed);
            }
        } else if verdict.is_malicious && verdict.user_query.is_none() {
            verdict.user_query = Some(confirmation_query(&verdict));
        }

        log::info!(
            "Threat reasoning finished: malicious={}, tool calls={}, containment={}",
            verdict.is_malicious,
            outcome.invocations.len(),
            executed.len()
        );

        Ok(ReasoningOutcome {
            verdict,
            invocations: outcome.invocations,
        })
    }

    fn build_request(&self, snapshot: &SystemSnapshot) -> GenerateRequest {
        let (mode, actions_field) = if self.policy.autonomous {
            (prompt::MODE_AUTONOMOUS, "actionsTaken")
        } else {
            (prompt::MODE_ANALYSIS_ONLY, "recommendedActions")
        };

        let mut values = vec![("mode", mode), ("actionsField", actions_field)];
        values.extend(snapshot.template_values());
        let text = render_template(prompt::ANALYSIS, &values);

        let input = serde_json::to_value(snapshot).unwrap_or_else(|_| json!({}));
        GenerateRequest::new(Stage::ThreatReasoning, prompt::SYSTEM, text, input)
    }
}

fn describe_executed(executed: &[ToolInvocation]) -> String {
    executed
        .iter()
        .map(|i| format!("{} {}", i.name, i.target()))
        .collect::<Vec<_>>()
        .join("; ")
}

fn confirmation_query(verdict: &ReasoningVerdict) -> String {
    let excerpt: String = verdict.reasoning.chars().take(QUERY_EXCERPT_CHARS).collect();
    let ellipsis = if verdict.reasoning.chars().count() > QUERY_EXCERPT_CHARS { "..." } else { "" };
    if verdict.recommended_actions.trim().is_empty() {
        format!("I detected suspicious activity: {}{}. Shall I start incident response?", excerpt, ellipsis)
    } else {
        format!(
            "I detected suspicious activity: {}{}. I recommend: {}. Shall I proceed?",
            excerpt, ellipsis, verdict.recommended_actions
        )
    }
}
