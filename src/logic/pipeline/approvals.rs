//! Approval Queue - malicious verdicts waiting for a human decision
//!
//! Analysis-only runs park here. An approval is taken at most once and
//! is dropped once it expires.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::logic::collector::SystemSnapshot;
use crate::logic::threat::ReasoningVerdict;
use crate::logic::tools::ToolInvocation;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub id: String,
    pub run_id: Uuid,
    pub user_query: String,
    pub verdict: ReasoningVerdict,
    #[serde(skip)]
    pub snapshot: SystemSnapshot,
    #[serde(skip)]
    pub reasoning_invocations: Vec<ToolInvocation>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct ApprovalQueue {
    pending: Mutex<Vec<PendingApproval>>,
    ttl: chrono::Duration,
}

impl ApprovalQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    pub fn push(
        &self,
        run_id: Uuid,
        verdict: ReasoningVerdict,
        snapshot: SystemSnapshot,
        reasoning_invocations: Vec<ToolInvocation>,
    ) -> PendingApproval {
        let now = Utc::now();
        let approval = PendingApproval {
            id: Uuid::new_v4().to_string(),
            run_id,
            user_query: verdict.user_query.clone().unwrap_or_default(),
            verdict,
            snapshot,
            reasoning_invocations,
            created_at: now,
            expires_at: now + self.ttl,
        };

        log::info!("Approval {} pending until {}", approval.id, approval.expires_at.to_rfc3339());
        self.pending.lock().push(approval.clone());
        approval
    }

    /// Remove and return a live approval
    pub fn take(&self, id: &str) -> Option<PendingApproval> {
        let mut pending = self.pending.lock();
        Self::purge(&mut pending);
        let idx = pending.iter().position(|a| a.id == id)?;
        Some(pending.remove(idx))
    }

    /// Returns false when the id is unknown or already expired
    pub fn dismiss(&self, id: &str) -> bool {
        let mut pending = self.pending.lock();
        Self::purge(&mut pending);
        let before = pending.len();
        pending.retain(|a| a.id != id);
        pending.len() != before
    }

    pub fn pending(&self) -> Vec<PendingApproval> {
        let mut pending = self.pending.lock();
        Self::purge(&mut pending);
        pending.clone()
    }

    fn purge(pending: &mut Vec<PendingApproval>) {
        let now = Utc::now();
        let before = pending.len();
        pending.retain(|a| a.expires_at > now);
        let expired = before - pending.len();
        if expired > 0 {
            log::info!("{} approval(s) expired without a decision", expired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict() -> ReasoningVerdict {
        ReasoningVerdict {
            is_malicious: true,
            reasoning: "evil.exe C2".into(),
            recommended_actions: "Block 198.51.100.24".into(),
            user_query: Some("Shall I block 198.51.100.24?".into()),
            attacker_profile: None,
        }
    }

    fn snapshot() -> SystemSnapshot {
        SystemSnapshot::new("1234 evil.exe", "")
    }

    #[test]
    fn test_take_once() {
        let queue = ApprovalQueue::new(Duration::from_secs(60));
        let approval = queue.push(Uuid::new_v4(), verdict(), snapshot(), Vec::new());

        assert_eq!(approval.user_query, "Shall I block 198.51.100.24?");
        assert_eq!(queue.pending().len(), 1);
        assert!(queue.take(&approval.id).is_some());
        assert!(queue.take(&approval.id).is_none());
    }

    #[test]
    fn test_dismiss() {
        let queue = ApprovalQueue::new(Duration::from_secs(60));
        let approval = queue.push(Uuid::new_v4(), verdict(), snapshot(), Vec::new());

        assert!(!queue.dismiss("unknown"));
        assert!(queue.dismiss(&approval.id));
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_expired_approvals_are_dropped() {
        let queue = ApprovalQueue::new(Duration::ZERO);
        let approval = queue.push(Uuid::new_v4(), verdict(), snapshot(), Vec::new());

        assert!(queue.take(&approval.id).is_none());
        assert!(queue.pending().is_empty());
    }
}
