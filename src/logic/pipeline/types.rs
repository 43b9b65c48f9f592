//! Pipeline types - run outcomes and run failures

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::VigilError;
use crate::logic::backend::Stage;
use crate::logic::incident::IncidentResponse;
use crate::logic::profile::AttackerProfile;
use crate::logic::threat::ReasoningVerdict;
use crate::logic::tools::ToolInvocation;

/// Where a run ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Disposition {
    Benign,
    #[serde(rename_all = "camelCase")]
    Handled {
        response: IncidentResponse,
        profile: AttackerProfile,
    },
    #[serde(rename_all = "camelCase")]
    AwaitingConfirmation { approval_id: String, user_query: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub verdict: ReasoningVerdict,
    pub reasoning_invocations: Vec<ToolInvocation>,
    pub disposition: Disposition,
}

impl PipelineOutcome {
    pub fn is_malicious(&self) -> bool {
        self.verdict.is_malicious
    }

    pub fn response(&self) -> Option<&IncidentResponse> {
        match &self.disposition {
            Disposition::Handled { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&AttackerProfile> {
        match &self.disposition {
            Disposition::Handled { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

/// Outputs of the stages that completed before a failure
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialOutputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ReasoningVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<IncidentResponse>,
}

/// A run that ended early. Containment already executed stays in place.
#[derive(Debug, Clone, Error)]
#[error("run {run_id} failed at {stage}: {error}")]
pub struct PipelineError {
    pub run_id: Uuid,
    pub stage: Stage,
    #[source]
    pub error: VigilError,
    pub partial: PartialOutputs,
}

impl PipelineError {
    pub fn new(run_id: Uuid, stage: Stage, error: VigilError, partial: PartialOutputs) -> Self {
        Self {
            run_id,
            stage,
            error,
            partial,
        }
    }

    /// JSON report for the binary's output
    pub fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "runId": self.run_id,
            "stage": self.stage,
            "kind": self.error.kind(),
            "error": self.error.to_string(),
            "partial": self.partial,
        })
    }
}
