//! Threat reasoning types

use serde::{Deserialize, Serialize};

use crate::logic::agent::lenient;
use crate::logic::tools::ToolInvocation;

/// Short attacker summary produced alongside a malicious verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackerSummary {
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
}

/// Malicious/benign determination plus rationale.
///
/// Replies may carry `recommendedActions`, `actionsTaken` or both; see
/// [`VerdictReply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "VerdictReply")]
pub struct ReasoningVerdict {
    pub is_malicious: bool,
    pub reasoning: String,
    pub recommended_actions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attacker_profile: Option<AttackerSummary>,
}

/// Verdict exactly as the model wrote it.
///
/// Autonomous runs report `actionsTaken`, analysis-only runs report
/// `recommendedActions`. Both keys are accepted together.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictReply {
    #[serde(deserialize_with = "lenient::boolean")]
    is_malicious: bool,
    #[serde(deserialize_with = "lenient::text")]
    reasoning: String,
    #[serde(default, deserialize_with = "lenient::text")]
    recommended_actions: String,
    #[serde(default, deserialize_with = "lenient::text")]
    actions_taken: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    user_query: Option<String>,
    #[serde(default)]
    attacker_profile: Option<AttackerSummary>,
}

impl VerdictReply {
    /// Keep the actions field that belongs to the mode, falling back to the other
    pub fn into_verdict(self, autonomous: bool) -> ReasoningVerdict {
        let (preferred, other) = if autonomous {
            (self.actions_taken, self.recommended_actions)
        } else {
            (self.recommended_actions, self.actions_taken)
        };
        ReasoningVerdict {
            is_malicious: self.is_malicious,
            reasoning: self.reasoning,
            recommended_actions: if preferred.trim().is_empty() { other } else { preferred },
            user_query: self.user_query,
            attacker_profile: self.attacker_profile,
        }
    }
}

impl From<VerdictReply> for ReasoningVerdict {
    fn from(reply: VerdictReply) -> Self {
        reply.into_verdict(false)
    }
}

impl ReasoningVerdict {
    pub fn attacker_profile_summary(&self) -> Option<&str> {
        self.attacker_profile
            .as_ref()
            .map(|p| p.summary.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Verdict plus the tools the stage ran to reach it
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub verdict: ReasoningVerdict,
    pub invocations: Vec<ToolInvocation>,
}
