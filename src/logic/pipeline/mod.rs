//! Pipeline Module - Orchestrator
//!
//! One run: Reasoning -> (malicious) IncidentResponse -> AttackerProfile.
//! Stages run strictly in sequence; only the snapshot collection fans out.
//! Analysis-only verdicts park in the approval queue until confirmed.
//!
//! ## Structure
//! - `types`: Outcomes and run failures
//! - `approvals`: Pending confirmation queue

pub mod approvals;
pub mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::logic::agent::ToolLoop;
use crate::logic::backend::{ReasoningBackend, Stage};
use crate::logic::collector::{collect_snapshot, SnapshotSource, SystemSnapshot};
use crate::logic::config::VigilConfig;
use crate::logic::honeypot::HoneypotStore;
use crate::logic::incident::{IncidentResponder, IncidentResponse};
use crate::logic::intel::KnowledgeGraphIngestor;
use crate::logic::policy::PolicyAdvisor;
use crate::logic::profile::{AttackerProfile, AttackerProfiler, ProfileRequest, ThreatLevelPolicy};
use crate::logic::threat::{ReasoningVerdict, ThreatReasoner, ThreatSimulator};
use crate::logic::tools::ToolExecutor;

pub use approvals::{ApprovalQueue, PendingApproval};
pub use types::{Disposition, PartialOutputs, PipelineError, PipelineOutcome};

/// Title given to every incident the pipeline raises
pub const INCIDENT_TITLE: &str = "AI-Detected Anomaly";

pub struct Pipeline {
    config: VigilConfig,
    backend: Arc<dyn ReasoningBackend>,
    executor: Arc<ToolExecutor>,
    reasoner: ThreatReasoner,
    responder: IncidentResponder,
    profiler: AttackerProfiler,
    approvals: ApprovalQueue,
}

impl Pipeline {
    pub fn new(config: VigilConfig, backend: Arc<dyn ReasoningBackend>, executor: Arc<ToolExecutor>) -> Self {
        let agent = ToolLoop::new(backend.clone(), config.pipeline.max_tool_turns);
        let approval_ttl = std::time::Duration::from_secs(config.pipeline.approval_timeout_secs);

        Self {
            reasoner: ThreatReasoner::new(agent.clone(), executor.clone(), config.policy),
            responder: IncidentResponder::new(agent.clone(), executor.clone()),
            profiler: AttackerProfiler::new(agent),
            approvals: ApprovalQueue::new(approval_ttl),
            config,
            backend,
            executor,
        }
    }

    /// Executor (live or simulated, per config) with a fresh honeypot store
    pub fn from_config(config: VigilConfig, backend: Arc<dyn ReasoningBackend>) -> Self {
        let honeypots = Arc::new(HoneypotStore::new());
        let executor = Arc::new(ToolExecutor::from_config(&config.execution, honeypots));
        Self::new(config, backend, executor)
    }

    pub fn with_level_policy(mut self, policy: Box<dyn ThreatLevelPolicy>) -> Self {
        self.profiler = self.profiler.with_level_policy(policy);
        self
    }

    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn honeypots(&self) -> &Arc<HoneypotStore> {
        self.executor.honeypots()
    }

    pub fn approvals(&self) -> &ApprovalQueue {
        &self.approvals
    }

    /// Stages outside the scan path share the backend and turn budget
    pub fn simulator(&self) -> ThreatSimulator {
        ThreatSimulator::new(self.agent())
    }

    pub fn ingestor(&self) -> KnowledgeGraphIngestor {
        KnowledgeGraphIngestor::new(self.agent())
    }

    pub fn advisor(&self) -> PolicyAdvisor {
        PolicyAdvisor::new(self.agent())
    }

    fn agent(&self) -> ToolLoop {
        ToolLoop::new(self.backend.clone(), self.config.pipeline.max_tool_turns)
    }

    /// Collect a snapshot from `source`, then run
    pub async fn scan(&self, source: &dyn SnapshotSource) -> Result<PipelineOutcome, PipelineError> {
        let snapshot = collect_snapshot(source, self.config.execution.command_timeout()).await;
        self.run(snapshot).await
    }

    pub async fn run(&self, snapshot: SystemSnapshot) -> Result<PipelineOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log::info!("Run {} started", run_id);

        let reasoning = self
            .reasoner
            .reason(&snapshot)
            .await
            .map_err(|e| self.fail(run_id, Stage::ThreatReasoning, e, PartialOutputs::default()))?;
        let verdict = reasoning.verdict;

        let disposition = if !verdict.is_malicious {
            log::info!("Run {}: benign", run_id);
            Disposition::Benign
        } else if self.reasoner.policy().autonomous {
            let (response, profile) = self.respond_and_profile(run_id, &verdict, &snapshot).await?;
            Disposition::Handled { response, profile }
        } else {
            let approval = self.approvals.push(
                run_id,
                verdict.clone(),
                snapshot,
                reasoning.invocations.clone(),
            );
            log::warn!("Run {}: malicious, awaiting confirmation ({})", run_id, approval.id);
            Disposition::AwaitingConfirmation {
                approval_id: approval.id,
                user_query: approval.user_query,
            }
        };

        Ok(PipelineOutcome {
            run_id,
            started_at,
            verdict,
            reasoning_invocations: reasoning.invocations,
            disposition,
        })
    }

    /// Run the deferred response for a pending approval.
    /// `Ok(None)` when the id is unknown or expired.
    pub async fn confirm(&self, approval_id: &str) -> Result<Option<PipelineOutcome>, PipelineError> {
        let Some(approval) = self.approvals.take(approval_id) else {
            log::warn!("Approval {} not found or expired", approval_id);
            return Ok(None);
        };

        log::info!("Approval {} confirmed for run {}", approval.id, approval.run_id);
        let (response, profile) = self
            .respond_and_profile(approval.run_id, &approval.verdict, &approval.snapshot)
            .await?;

        Ok(Some(PipelineOutcome {
            run_id: approval.run_id,
            started_at: approval.created_at,
            verdict: approval.verdict,
            reasoning_invocations: approval.reasoning_invocations,
            disposition: Disposition::Handled { response, profile },
        }))
    }

    pub fn dismiss(&self, approval_id: &str) -> bool {
        let dismissed = self.approvals.dismiss(approval_id);
        if dismissed {
            log::info!("Approval {} dismissed", approval_id);
        }
        dismissed
    }

    async fn respond_and_profile(
        &self,
        run_id: Uuid,
        verdict: &ReasoningVerdict,
        snapshot: &SystemSnapshot,
    ) -> Result<(IncidentResponse, AttackerProfile), PipelineError> {
        let state = snapshot.render_state();

        let response = self
            .responder
            .respond(&verdict.reasoning, &state)
            .await
            .map_err(|e| {
                let partial = PartialOutputs {
                    verdict: Some(verdict.clone()),
                    response: None,
                };
                self.fail(run_id, Stage::IncidentResponse, e, partial)
            })?;

        let request = ProfileRequest {
            incident_data: verdict.reasoning.clone(),
            logs: snapshot.logs.clone(),
            descriptors: format!("{}. Response: {}", INCIDENT_TITLE, response.summary),
            system_states: format!("{}\n\nContainment Actions:\n{}", state, response.action_log()),
            containment_actions: response.containment_count(),
        };

        let profile = self.profiler.profile(&request).await.map_err(|e| {
            let partial = PartialOutputs {
                verdict: Some(verdict.clone()),
                response: Some(response.clone()),
            };
            self.fail(run_id, Stage::AttackerProfile, e, partial)
        })?;

        log::info!(
            "Run {}: handled, {} containment action(s), threat level {}",
            run_id,
            response.containment_count(),
            profile.threat_level
        );
        Ok((response, profile))
    }

    fn fail(&self, run_id: Uuid, stage: Stage, error: crate::error::VigilError, partial: PartialOutputs) -> PipelineError {
        let executed = partial.response.as_ref().map_or(0, IncidentResponse::containment_count);
        if executed > 0 {
            log::error!(
                "Run {} failed at {} after {} containment action(s); they stay in place: {}",
                run_id,
                stage,
                executed,
                error
            );
        } else {
            log::error!("Run {} failed at {}: {}", run_id, stage, error);
        }
        PipelineError::new(run_id, stage, error, partial)
    }
}
